//! Provider registry.
//!
//! Constructs every configured adapter once at startup and hands out shared
//! handles keyed by provider id.

use crate::anthropic::AnthropicProvider;
use crate::buffered::BufferedProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;
use sb_domain::config::{LlmConfig, ProviderConfig};
use sb_domain::error::{Error, Result};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

/// Adapter family selected by a provider's `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// OpenAI chat completions contract (OpenAI, Qwen/DashScope, local servers).
    OpenaiCompat,
    Anthropic,
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai_compat" | "openai" | "qwen" | "dashscope" => Ok(Self::OpenaiCompat),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(Error::UnsupportedProvider(other.to_string())),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ProviderRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    default_id: Option<String>,
}

/// Build one adapter. Providers with `streaming = false` are wrapped so
/// they still honour the streaming contract.
pub fn build_provider(pc: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    let kind: ProviderKind = pc.kind.parse()?;
    let adapter: Arc<dyn LlmProvider> = match kind {
        ProviderKind::OpenaiCompat => Arc::new(OpenAiCompatProvider::from_config(pc)?),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::from_config(pc)?),
    };
    if pc.streaming {
        Ok(adapter)
    } else {
        Ok(Arc::new(BufferedProvider::new(adapter)))
    }
}

impl ProviderRegistry {
    /// Build the registry from the application's [`LlmConfig`].
    ///
    /// Any provider that fails to initialize (unknown kind, missing key)
    /// aborts construction: a misconfigured backend must not surface first
    /// as a failed chat exchange.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let mut registry = Self::default();

        for pc in &config.providers {
            let provider = build_provider(pc).map_err(|e| {
                tracing::error!(provider_id = %pc.id, kind = %pc.kind, error = %e, "failed to initialize LLM provider");
                e
            })?;
            tracing::info!(
                provider_id = %pc.id,
                kind = %pc.kind,
                streaming = pc.streaming,
                "registered LLM provider"
            );
            registry.providers.insert(pc.id.clone(), provider);
        }

        registry.default_id = config.default_provider_id().map(String::from);
        if let Some(id) = &registry.default_id {
            if !registry.providers.contains_key(id) {
                return Err(Error::Config(format!(
                    "default provider '{id}' is not configured"
                )));
            }
        }

        Ok(registry)
    }

    /// Register an already-built provider. The first one inserted becomes
    /// the default unless a default was set.
    pub fn insert(&mut self, provider: Arc<dyn LlmProvider>) {
        let id = provider.provider_id().to_string();
        if self.default_id.is_none() {
            self.default_id = Some(id.clone());
        }
        self.providers.insert(id, provider);
    }

    /// Look up a provider by its config id.
    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(provider_id).cloned()
    }

    /// The provider general-purpose calls go to.
    pub fn default_provider(&self) -> Option<Arc<dyn LlmProvider>> {
        self.default_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn default_id(&self) -> Option<&str> {
        self.default_id.as_deref()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// List all registered provider IDs (sorted).
    pub fn list_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }
}
