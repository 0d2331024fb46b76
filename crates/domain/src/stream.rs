use std::pin::Pin;

use crate::error::Result;

/// A boxed async stream, used for LLM streaming responses.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// A lazy, finite, non-restartable sequence of non-empty answer increments.
///
/// Dropping the stream before exhaustion cancels the underlying upstream
/// call.
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// Events emitted by a provider's wire parser while streaming.
///
/// Adapters reduce these to a [`FragmentStream`]: tokens become fragments,
/// `Done` ends the stream and `Error` ends it with a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A text token chunk.
    Token { text: String },

    /// Stream is finished.
    Done { finish_reason: Option<String> },

    /// The backend reported an error mid-stream.
    Error { message: String },
}
