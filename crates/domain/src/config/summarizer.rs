use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Summarizer (secondary model)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The cheaper model used to write compaction summaries (Anthropic
/// Messages API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default = "d_model")]
    pub model: String,
    /// Env var containing the API key. When unset, summaries fall back to
    /// a deterministic template.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    /// Direct key (for config-only setups; prefer `api_key_env`).
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "d_512")]
    pub max_tokens: u32,
    #[serde(default = "d_30")]
    pub timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            model: d_model(),
            api_key_env: d_api_key_env(),
            api_key: None,
            max_tokens: 512,
            timeout_secs: 30,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_base_url() -> String {
    "https://api.anthropic.com".into()
}
fn d_model() -> String {
    "claude-haiku-4-5".into()
}
fn d_api_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn d_512() -> u32 {
    512
}
fn d_30() -> u64 {
    30
}
