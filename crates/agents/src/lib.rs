//! Task responders and intent routing.
//!
//! A [`TaskResponder`] turns one [`Exchange`] into a fragment stream. The
//! [`ResponderRegistry`] holds the named responders plus the default
//! (direct) one, and the [`IntentRouter`] picks between them with one
//! structured-output classification call per inbound message.

pub mod registry;
pub mod responder;
pub mod responders;
pub mod router;

pub use registry::ResponderRegistry;
pub use responder::{Exchange, ResponderInfo, TaskResponder};
pub use router::{Classification, IntentDecision, IntentRouter, Routed};
