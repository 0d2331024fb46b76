//! AppState construction extracted from `main.rs`.
//!
//! [`build_app_state`] is the shared boot path used by `serve` and the
//! `agents` command. [`assemble`] wires an already-built provider registry
//! and collaborator set, which lets tests boot the full runtime against
//! scripted providers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use sb_agents::responders::{document_analysis, financial_analysis, DirectResponder};
use sb_agents::{IntentRouter, ResponderRegistry};
use sb_domain::config::{Config, ConfigSeverity};
use sb_providers::registry::ProviderRegistry;
use sb_providers::LlmProvider;
use sb_store::{
    Authenticator, BlobStore, ConversationStore, InMemoryConversationStore, TempDirBlobStore,
    TextExtractor, TokenAuthenticator,
};

use crate::runtime::{AttachmentBridge, ChatPipeline, SessionManager};
use crate::state::AppState;

/// The external collaborators the chat pipeline talks to.
pub struct Collaborators {
    pub auth: Arc<dyn Authenticator>,
    pub conversations: Arc<dyn ConversationStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub extractor: Arc<dyn TextExtractor>,
}

impl Collaborators {
    /// The in-process implementations, configured from `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let auth = TokenAuthenticator::from_config(&config.access);
        if auth.is_empty() {
            tracing::warn!("no principal has a usable token; every chat connection will be rejected");
        } else {
            tracing::info!(principals = auth.len(), "token authenticator ready");
        }

        let blobs = Arc::new(
            TempDirBlobStore::new(config.attachments.dir.clone())
                .context("initializing attachment directory")?,
        );
        tracing::info!(dir = %blobs.dir().display(), "attachment store ready");

        Ok(Self {
            auth: Arc::new(auth),
            conversations: Arc::new(InMemoryConversationStore::new()),
            blobs: blobs.clone(),
            extractor: blobs,
        })
    }
}

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── LLM providers ────────────────────────────────────────────────
    let llm = Arc::new(
        ProviderRegistry::from_config(&config.llm).context("initializing LLM providers")?,
    );
    tracing::info!(
        providers = llm.len(),
        default = ?llm.default_id(),
        "LLM provider registry ready"
    );

    // ── Collaborators ────────────────────────────────────────────────
    let collaborators = Collaborators::from_config(&config)?;

    assemble(config, llm, collaborators)
}

/// Wire responders, router, pipeline and session manager around the given
/// providers and collaborators.
pub fn assemble(
    config: Arc<Config>,
    llm: Arc<ProviderRegistry>,
    collaborators: Collaborators,
) -> anyhow::Result<AppState> {
    let provider = llm
        .default_provider()
        .context("no default LLM provider configured")?;

    // ── Responders + intent router ───────────────────────────────────
    let responders = Arc::new(build_responders(provider.clone()));
    let router = Arc::new(
        IntentRouter::new(responders.clone(), provider)
            .with_model(config.llm.classifier_model.clone()),
    );

    // ── Exchange pipeline ────────────────────────────────────────────
    let attachments = AttachmentBridge::new(collaborators.extractor, collaborators.blobs.clone())
        .with_cleanup(config.attachments.cleanup_after_exchange);
    let idle_timeout = config.chat.stream_idle_timeout_secs.map(Duration::from_secs);
    let pipeline = Arc::new(
        ChatPipeline::new(collaborators.conversations.clone(), router.clone(), attachments)
            .with_idle_timeout(idle_timeout),
    );
    match idle_timeout {
        Some(t) => tracing::info!(idle_timeout_secs = t.as_secs(), "stream idle timeout set"),
        None => tracing::info!("stream idle timeout disabled"),
    }

    // ── Sessions ─────────────────────────────────────────────────────
    let sessions = Arc::new(SessionManager::new(
        collaborators.auth.clone(),
        collaborators.conversations.clone(),
        pipeline.clone(),
    ));

    Ok(AppState {
        config,
        llm,
        responders,
        router,
        auth: collaborators.auth,
        conversations: collaborators.conversations,
        blobs: collaborators.blobs,
        pipeline,
        sessions,
    })
}

/// The task responders every deployment carries, all backed by `provider`,
/// plus the direct responder as the default.
pub fn build_responders(provider: Arc<dyn LlmProvider>) -> ResponderRegistry {
    let registry = ResponderRegistry::new(Arc::new(DirectResponder::new(provider.clone())));
    registry.register(Arc::new(financial_analysis(provider.clone())));
    registry.register(Arc::new(document_analysis(provider)));
    tracing::info!(
        responders = registry.len(),
        default = %registry.default_name(),
        "responder registry ready"
    );
    registry
}
