use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Compaction
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compaction replaces an oversized session with a short summary and
/// starts a fresh provider session seeded with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactionConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// Context size (input + cache tokens) above which a session compacts.
    #[serde(default = "d_50000")]
    pub threshold_tokens: u64,
    /// Transcript bytes per token, used when no token count was recorded
    /// for the session in this process.
    #[serde(default = "d_bytes_per_token")]
    pub bytes_per_token: f64,
    /// How many of the most recent history messages feed the summary.
    #[serde(default = "d_20")]
    pub recent_messages: usize,
    /// Per-message character cap inside the summary prompt.
    #[serde(default = "d_1000")]
    pub message_chars: usize,
    /// Character cap for each message quoted by the fallback summary.
    #[serde(default = "d_500")]
    pub fallback_chars: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_tokens: 50_000,
            bytes_per_token: d_bytes_per_token(),
            recent_messages: 20,
            message_chars: 1_000,
            fallback_chars: 500,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_true() -> bool {
    true
}
fn d_50000() -> u64 {
    50_000
}
fn d_bytes_per_token() -> f64 {
    1.45
}
fn d_20() -> usize {
    20
}
fn d_1000() -> usize {
    1_000
}
fn d_500() -> usize {
    500
}
