//! Shared types for the agent relay: configuration, errors, the provider
//! message model, and the normalized event vocabulary sent to clients.

pub mod config;
pub mod error;
pub mod event;
pub mod message;
pub mod stream;
pub mod trace;
