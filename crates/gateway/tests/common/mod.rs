#![allow(dead_code)]

use std::sync::Arc;

use sb_domain::config::Config;
use sb_domain::principal::Principal;
use sb_gateway::bootstrap::{self, Collaborators};
use sb_gateway::state::AppState;
use sb_providers::registry::ProviderRegistry;
use sb_providers::scripted::ScriptedProvider;
use sb_store::{InMemoryConversationStore, TempDirBlobStore, TokenAuthenticator};

pub const ALICE: &str = "tok-alice";
pub const BOB: &str = "tok-bob";
pub const BANNED: &str = "tok-mallory";

pub struct Harness {
    pub state: AppState,
    pub provider: Arc<ScriptedProvider>,
    pub blobs: Arc<TempDirBlobStore>,
    _dir: tempfile::TempDir,
}

impl Harness {
    /// Create a conversation owned by `alice`.
    pub async fn alice_conversation(&self) -> String {
        self.state
            .conversations
            .create("alice", Some("test".into()))
            .await
            .unwrap()
            .id
    }
}

pub fn harness(provider: ScriptedProvider) -> Harness {
    harness_with(provider, Config::default())
}

pub fn harness_with(provider: ScriptedProvider, config: Config) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(provider);
    let blobs = Arc::new(TempDirBlobStore::new(dir.path()).unwrap());

    let mut mallory = Principal::new("mallory");
    mallory.banned = true;
    let auth = TokenAuthenticator::default()
        .with_token(Principal::new("alice"), ALICE)
        .with_token(Principal::new("bob"), BOB)
        .with_token(mallory, BANNED);

    let mut llm = ProviderRegistry::default();
    llm.insert(provider.clone());

    let collaborators = Collaborators {
        auth: Arc::new(auth),
        conversations: Arc::new(InMemoryConversationStore::new()),
        blobs: blobs.clone(),
        extractor: blobs.clone(),
    };
    let state = bootstrap::assemble(Arc::new(config), Arc::new(llm), collaborators).unwrap();

    Harness {
        state,
        provider,
        blobs,
        _dir: dir,
    }
}

/// Classifier reply selecting `responder`.
pub fn decision(responder: &str) -> String {
    format!(
        r#"{{"intent":"test","confidence":0.9,"agent":"{responder}","reasoning":"scripted"}}"#
    )
}
