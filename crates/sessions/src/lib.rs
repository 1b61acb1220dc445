//! Session state for the relay.
//!
//! The agent engine owns durable session storage (append-only JSONL
//! transcripts on disk); this crate only reads those transcripts back and
//! keeps the process-lifetime token counts used for compaction decisions.

pub mod tokens;
pub mod transcript;

pub use tokens::{InMemoryTokenStore, TokenStore};
pub use transcript::{HistoryMessage, HistoryRole, TranscriptStore};
