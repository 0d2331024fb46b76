use serde::{Deserialize, Serialize};

/// An authenticated identity. Ownership key for all conversation access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(default = "d_role")]
    pub role: String,
    #[serde(default)]
    pub banned: bool,
    #[serde(default = "d_true")]
    pub active: bool,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: d_role(),
            banned: false,
            active: true,
        }
    }

    /// Banned or deactivated principals may not open sessions.
    pub fn may_connect(&self) -> bool {
        self.active && !self.banned
    }
}

/// Capability to act on one conversation: the id plus its verified owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationHandle {
    pub conversation_id: String,
    pub owner_principal_id: String,
}

fn d_role() -> String {
    "user".into()
}
fn d_true() -> bool {
    true
}
