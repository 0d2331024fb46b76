//! LLM provider adapters behind one streaming contract.
//!
//! Every backend is exposed as an [`LlmProvider`]: a one-shot completion plus
//! a lazy fragment stream. Native-streaming backends (OpenAI-compatible,
//! Anthropic) map their SSE increments onto fragments; non-streaming ones
//! are wrapped by [`buffered::BufferedProvider`].

pub mod anthropic;
pub mod buffered;
pub mod openai_compat;
pub mod registry;
pub mod scripted;
pub mod traits;
pub(crate) mod sse;
pub(crate) mod util;

// Re-exports for convenience.
pub use registry::{ProviderKind, ProviderRegistry};
pub use traits::{ChatRequest, ChatResponse, LlmProvider};
