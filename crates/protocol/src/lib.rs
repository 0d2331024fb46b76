//! Chat wire protocol: the frames exchanged over the chat WebSocket and the
//! request-response chat endpoint, plus the sequencer that enforces the
//! "exactly one terminal frame" rule for an exchange.

mod frame;
mod sequencer;

pub use frame::{ChatReply, ClientMessage, FragmentMetadata, StreamFragment};
pub use sequencer::FrameSequencer;
