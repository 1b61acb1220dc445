//! Core runtime: drives one agent run from a chat request to a stream of
//! normalized events.
//!
//! Entry point: [`start_turn`] takes a validated [`ChatTurn`], compacts the
//! session if it has grown too large, and returns an [`ActiveRun`] that the
//! API layer drains into SSE frames or a single JSON response.

pub mod cancel;
pub mod compact;
pub mod heartbeat;
pub mod relay;
pub mod run;
pub mod translate;

pub use cancel::CancelMap;
pub use relay::{start_turn, ActiveRun, ChatTurn};
pub use run::{start_run, AgentRun, RunOptions, INCOMPLETE_RUN_ERROR};
