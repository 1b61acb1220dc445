use std::sync::Arc;

use relay_domain::config::Config;
use relay_providers::{AgentProvider, LlmProvider};
use relay_sessions::{TokenStore, TranscriptStore};

use crate::runtime::cancel::CancelMap;

/// Shared application state passed to all API handlers.
///
/// Fields are grouped by concern:
/// - **Core services** — config, the agent provider, the summarizer
/// - **Session state** — transcripts on disk, recorded token counts
/// - **Runtime** — abort tokens for active runs
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub provider: Arc<dyn AgentProvider>,
    /// Used for compaction summaries. `None` means the fallback template.
    pub summarizer: Option<Arc<dyn LlmProvider>>,

    // ── Session state ─────────────────────────────────────────────────
    pub transcripts: Arc<TranscriptStore>,
    pub tokens: Arc<dyn TokenStore>,

    // ── Runtime ───────────────────────────────────────────────────────
    pub cancel_map: Arc<CancelMap>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        provider: Arc<dyn AgentProvider>,
        summarizer: Option<Arc<dyn LlmProvider>>,
        transcripts: Arc<TranscriptStore>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            config,
            provider,
            summarizer,
            transcripts,
            tokens,
            cancel_map: Arc::new(CancelMap::new()),
        }
    }
}
