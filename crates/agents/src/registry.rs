use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::responder::{ResponderInfo, TaskResponder};

/// Named responders plus the default one that handles unrouted exchanges.
///
/// The default responder is registered under its own name like any other,
/// so it shows up in [`list`](Self::list).
pub struct ResponderRegistry {
    responders: RwLock<HashMap<String, Arc<dyn TaskResponder>>>,
    default: Arc<dyn TaskResponder>,
    default_name: String,
}

impl ResponderRegistry {
    pub fn new(default: Arc<dyn TaskResponder>) -> Self {
        let default_name = default.name().to_string();
        let mut map: HashMap<String, Arc<dyn TaskResponder>> = HashMap::new();
        map.insert(default_name.clone(), default.clone());
        Self {
            responders: RwLock::new(map),
            default,
            default_name,
        }
    }

    /// Add a responder; a later registration under the same name wins.
    pub fn register(&self, responder: Arc<dyn TaskResponder>) {
        let name = responder.name().to_string();
        if name == self.default_name {
            tracing::warn!(responder = %name, "cannot replace the default responder, ignoring");
            return;
        }
        let replaced = self.responders.write().insert(name.clone(), responder);
        tracing::info!(responder = %name, replaced = replaced.is_some(), "registered responder");
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TaskResponder>> {
        self.responders.read().get(name).cloned()
    }

    pub fn default_responder(&self) -> Arc<dyn TaskResponder> {
        self.default.clone()
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    pub fn is_default(&self, name: &str) -> bool {
        name == self.default_name
    }

    /// All responders, sorted by name.
    pub fn list(&self) -> Vec<ResponderInfo> {
        let mut infos: Vec<ResponderInfo> = self
            .responders
            .read()
            .values()
            .map(|r| r.info().clone())
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn len(&self) -> usize {
        self.responders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.responders.read().is_empty()
    }
}
