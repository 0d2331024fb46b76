use sb_domain::error::Result;
use sb_domain::message::Message;
use sb_domain::stream::FragmentStream;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A provider-agnostic chat completion request.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// The conversation messages to send.
    pub messages: Vec<Message>,
    /// Sampling temperature (0.0 – 2.0). `None` lets the provider choose.
    pub temperature: Option<f32>,
    /// Maximum tokens in the response. `None` lets the provider choose.
    pub max_tokens: Option<u32>,
    /// When `true`, ask the model for a JSON object only.
    pub json_mode: bool,
    /// Model identifier override. When `None`, the provider uses its default.
    pub model: Option<String>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// A provider-agnostic chat completion response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Textual content of the response.
    pub content: String,
    /// The model that actually produced the response.
    pub model: String,
    /// The reason the model stopped generating (e.g. "stop", "length").
    pub finish_reason: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait that every LLM adapter must implement.
///
/// Both calls are cancellable by dropping: dropping the pending future
/// aborts the HTTP request, and dropping the returned stream closes the
/// upstream response body.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request and wait for the full answer.
    ///
    /// Fails with `Upstream` on transport or provider status errors and with
    /// `MalformedResponse` when the reply body cannot be interpreted.
    async fn complete_once(&self, req: ChatRequest) -> Result<ChatResponse>;

    /// Send a chat completion request and return the answer as a lazy
    /// stream of non-empty text fragments.
    ///
    /// The stream ends exactly when the answer is complete. A backend error
    /// after the stream started is delivered as a final `Err` item.
    async fn complete_streaming(&self, req: ChatRequest) -> Result<FragmentStream>;

    /// A unique identifier for this provider instance.
    fn provider_id(&self) -> &str;

    /// Whether fragments arrive incrementally from the backend.
    fn supports_streaming(&self) -> bool {
        true
    }
}
