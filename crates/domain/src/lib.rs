//! Shared types for the Switchboard workspace: errors, messages, principals,
//! streaming primitives and configuration.

pub mod config;
pub mod error;
pub mod message;
pub mod principal;
pub mod stream;
