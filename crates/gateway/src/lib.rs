//! Switchboard gateway: HTTP and WebSocket surface, session management and
//! the chat exchange runtime.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod state;
