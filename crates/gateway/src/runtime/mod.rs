//! Chat runtime: sessions, the exchange pipeline and frame delivery.
//!
//! A [`sessions::SessionManager`] owns the live connection bindings and
//! hands each inbound message to the [`exchange::ChatPipeline`], which
//! routes it and drives the responder stream through
//! [`delivery::deliver`] onto the session's [`outbound`] channel. Exchanges
//! on one conversation never overlap: [`turns::TurnLocks`] serializes them
//! across sessions and the request-response path.

pub mod attachments;
pub mod delivery;
pub mod exchange;
pub mod outbound;
pub mod sessions;
pub mod turns;

pub use attachments::AttachmentBridge;
pub use delivery::{Delivered, DeliveryEnd};
pub use exchange::ChatPipeline;
pub use sessions::{Session, SessionManager};
