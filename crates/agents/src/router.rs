//! Intent classification and routing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sb_domain::error::{Error, Result};
use sb_domain::message::Message;
use sb_domain::stream::FragmentStream;
use sb_providers::{ChatRequest, LlmProvider};

use crate::registry::ResponderRegistry;
use crate::responder::Exchange;

/// Structured classification of one inbound message. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDecision {
    pub intent: String,
    pub confidence: f64,
    #[serde(default, alias = "agent", alias = "responder")]
    pub responder_name: Option<String>,
    #[serde(default)]
    pub reasoning: String,
}

impl IntentDecision {
    /// Decision used whenever classification fails: direct handling.
    pub fn fallback() -> Self {
        Self {
            intent: "general_chat".into(),
            confidence: 0.5,
            responder_name: None,
            reasoning: "fallback".into(),
        }
    }
}

/// Outcome of [`IntentRouter::classify`].
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Decision(IntentDecision),
    Fallback {
        decision: IntentDecision,
        reason: String,
    },
}

impl Classification {
    pub fn decision(&self) -> &IntentDecision {
        match self {
            Classification::Decision(d) => d,
            Classification::Fallback { decision, .. } => decision,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Classification::Fallback { .. })
    }
}

/// A routed exchange: the decision, the responder that took it, and its
/// output stream.
pub struct Routed {
    pub classification: Classification,
    pub responder: String,
    pub stream: FragmentStream,
}

/// Parse a classifier reply into a decision.
///
/// The JSON object may be wrapped in prose or a Markdown code fence. Empty
/// or `"null"` responder names mean "no responder".
pub fn parse_decision(reply: &str) -> Result<IntentDecision> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &reply[s..=e],
        _ => {
            return Err(Error::MalformedResponse(
                "classifier reply contains no JSON object".into(),
            ))
        }
    };

    let mut decision: IntentDecision =
        serde_json::from_str(json).map_err(|e| Error::MalformedResponse(e.to_string()))?;

    if !decision.confidence.is_finite() || !(0.0..=1.0).contains(&decision.confidence) {
        return Err(Error::MalformedResponse(format!(
            "confidence {} outside [0, 1]",
            decision.confidence
        )));
    }
    decision.responder_name = decision
        .responder_name
        .filter(|n| !n.trim().is_empty() && !n.eq_ignore_ascii_case("null"));
    Ok(decision)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IntentRouter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct IntentRouter {
    registry: Arc<ResponderRegistry>,
    classifier: Arc<dyn LlmProvider>,
    model: Option<String>,
}

impl IntentRouter {
    pub fn new(registry: Arc<ResponderRegistry>, classifier: Arc<dyn LlmProvider>) -> Self {
        Self {
            registry,
            classifier,
            model: None,
        }
    }

    /// Model override for the classification call.
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn registry(&self) -> &Arc<ResponderRegistry> {
        &self.registry
    }

    /// System prompt listing every routable responder.
    pub fn build_prompt(&self) -> String {
        let catalog: Vec<String> = self
            .registry
            .list()
            .into_iter()
            .filter(|r| !self.registry.is_default(&r.name))
            .map(|r| format!("- {}: {} (category: {})", r.name, r.description, r.category))
            .collect();

        format!(
            "You route messages for a chat assistant. Read the user's message, \
decide which specialized responder should answer it, or whether it needs no \
specialized responder, and reply with a JSON object only.

Specialized responders:
{catalog}

Reply format:
{{\"intent\": \"short_snake_case_intent\", \"confidence\": 0.0-1.0, \"agent\": \"ResponderName or null\", \"reasoning\": \"one sentence\"}}

Use null for \"agent\" when the message is general conversation, a general \
question or creative writing.",
            catalog = catalog.join("\n")
        )
    }

    /// Classify one message. Upstream and parse failures are reported as
    /// [`Classification::Fallback`] carrying [`IntentDecision::fallback`].
    pub async fn classify(&self, message: &str) -> Classification {
        let req = ChatRequest::new(vec![
            Message::system(self.build_prompt()),
            Message::user(message),
        ])
        .with_model(self.model.clone())
        .with_temperature(0.0)
        .json();

        let result = match self.classifier.complete_once(req).await {
            Ok(resp) => parse_decision(&resp.content),
            Err(e) => Err(e),
        };

        match result {
            Ok(decision) => Classification::Decision(decision),
            Err(e) => {
                tracing::warn!(
                    provider = %self.classifier.provider_id(),
                    error = %e,
                    "intent classification failed, using fallback"
                );
                Classification::Fallback {
                    decision: IntentDecision::fallback(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Classify the exchange and hand it to the chosen responder. A decision
    /// naming no registered responder goes to the default responder.
    pub async fn route(&self, exchange: &Exchange) -> Result<Routed> {
        let classification = self.classify(&exchange.input).await;
        let decision = classification.decision();

        let responder = decision
            .responder_name
            .as_deref()
            .and_then(|name| self.registry.get(name))
            .unwrap_or_else(|| self.registry.default_responder());

        tracing::info!(
            conversation_id = %exchange.conversation_id,
            intent = %decision.intent,
            confidence = decision.confidence,
            requested = ?decision.responder_name,
            responder = %responder.name(),
            fallback = classification.is_fallback(),
            "message routed"
        );

        let stream = responder.respond(exchange).await?;
        Ok(Routed {
            responder: responder.name().to_string(),
            classification,
            stream,
        })
    }
}
