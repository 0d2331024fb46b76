use std::sync::Arc;

use sb_agents::{IntentRouter, ResponderRegistry};
use sb_domain::config::Config;
use sb_providers::registry::ProviderRegistry;
use sb_store::{Authenticator, BlobStore, ConversationStore};

use crate::runtime::{ChatPipeline, SessionManager};

/// Shared application state passed to all API handlers.
///
/// Fields are grouped by concern:
/// - **Core services**: config, LLM providers, responders and the router
/// - **Collaborators**: authenticator, conversation store, blob store
/// - **Runtime**: the exchange pipeline and the live session map
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub llm: Arc<ProviderRegistry>,
    pub responders: Arc<ResponderRegistry>,
    pub router: Arc<IntentRouter>,

    // ── Collaborators ─────────────────────────────────────────────────
    pub auth: Arc<dyn Authenticator>,
    pub conversations: Arc<dyn ConversationStore>,
    pub blobs: Arc<dyn BlobStore>,

    // ── Runtime ───────────────────────────────────────────────────────
    pub pipeline: Arc<ChatPipeline>,
    pub sessions: Arc<SessionManager>,
}
