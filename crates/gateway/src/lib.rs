//! The relay server: run loop, compaction, HTTP API and CLI.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod state;
