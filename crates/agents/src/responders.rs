//! Built-in responders.
//!
//! Task responders send a fixed system prompt plus the exchange prompt to a
//! provider; the direct responder sends the whole conversation.

use std::sync::Arc;

use sb_domain::error::Result;
use sb_domain::message::Message;
use sb_domain::stream::FragmentStream;
use sb_providers::{ChatRequest, LlmProvider};

use crate::responder::{Exchange, ResponderInfo, TaskResponder};

pub const FINANCIAL: &str = "FinancialAnalysis";
pub const DOCUMENT: &str = "DocumentAnalysis";
pub const GENERAL: &str = "General";

const FINANCIAL_PROMPT: &str = "\
You are a financial analysis assistant. You cover equities, cryptocurrencies, \
market sentiment and the interpretation of financial data, and you may explain \
technical analysis for educational purposes.

State clearly when you lack current market data and tell the user which data \
would let you answer. Answer in Markdown with short sections, tables where \
they help and a risk note. Always say that this is not financial advice.";

const DOCUMENT_PROMPT: &str = "\
You are a document analysis assistant. You summarize documents, extract key \
facts and structured data, and answer questions about their content.

Answer in Markdown: open with a short summary, then list key findings, use \
tables for tabular data and point to the parts of the document you rely on. \
If a document could not be read, say so and work with the rest.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Prompted task responder
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A task responder defined by its system prompt.
///
/// It sees only the exchange prompt (input plus attachment text), not the
/// conversation history.
pub struct PromptedResponder {
    info: ResponderInfo,
    system_prompt: String,
    provider: Arc<dyn LlmProvider>,
    model: Option<String>,
}

impl PromptedResponder {
    pub fn new(
        info: ResponderInfo,
        system_prompt: impl Into<String>,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            info,
            system_prompt: system_prompt.into(),
            provider,
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}

#[async_trait::async_trait]
impl TaskResponder for PromptedResponder {
    fn info(&self) -> &ResponderInfo {
        &self.info
    }

    async fn respond(&self, exchange: &Exchange) -> Result<FragmentStream> {
        let req = ChatRequest::new(vec![
            Message::system(self.system_prompt.clone()),
            Message::user(exchange.prompt()),
        ])
        .with_model(self.model.clone());
        self.provider.complete_streaming(req).await
    }
}

pub fn financial_analysis(provider: Arc<dyn LlmProvider>) -> PromptedResponder {
    PromptedResponder::new(
        ResponderInfo::new(
            FINANCIAL,
            "Financial market analysis: stock prices, cryptocurrency data, market sentiment and trading signals",
            "financial",
        ),
        FINANCIAL_PROMPT,
        provider,
    )
}

pub fn document_analysis(provider: Arc<dyn LlmProvider>) -> PromptedResponder {
    PromptedResponder::new(
        ResponderInfo::new(
            DOCUMENT,
            "Document analysis: summarizing uploaded files, extracting structured data and answering questions about them",
            "document",
        ),
        DOCUMENT_PROMPT,
        provider,
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Direct responder
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Handles exchanges no task responder claimed, with the full history.
pub struct DirectResponder {
    info: ResponderInfo,
    provider: Arc<dyn LlmProvider>,
}

impl DirectResponder {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            info: ResponderInfo::new(
                GENERAL,
                "General conversation, questions and writing handled directly by the model",
                "general",
            ),
            provider,
        }
    }
}

#[async_trait::async_trait]
impl TaskResponder for DirectResponder {
    fn info(&self) -> &ResponderInfo {
        &self.info
    }

    async fn respond(&self, exchange: &Exchange) -> Result<FragmentStream> {
        let req = ChatRequest::new(exchange.full_history());
        self.provider.complete_streaming(req).await
    }
}
