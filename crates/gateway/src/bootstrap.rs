//! AppState construction shared by the `serve` and `history` commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use relay_domain::config::{Config, ConfigSeverity};
use relay_providers::{AgentProvider, AnthropicProvider, ClaudeCliProvider, LlmProvider};
use relay_sessions::{InMemoryTokenStore, TranscriptStore};

use crate::state::AppState;

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Transcripts ──────────────────────────────────────────────────
    let transcripts = Arc::new(build_transcript_store(&config)?);
    tracing::info!(
        path = %transcripts.project_dir().display(),
        "transcript store ready"
    );

    // ── Agent provider ───────────────────────────────────────────────
    let provider: Arc<dyn AgentProvider> = Arc::new(ClaudeCliProvider::from_config(&config.agent));
    tracing::info!(
        binary = %config.agent.binary,
        permission_mode = config.agent.permission_mode.as_flag(),
        tools = config.agent.allowed_tools.len(),
        "agent provider ready"
    );

    // ── Summarizer ───────────────────────────────────────────────────
    let summarizer: Option<Arc<dyn LlmProvider>> =
        match AnthropicProvider::from_config(&config.summarizer) {
            Ok(p) => {
                tracing::info!(model = %config.summarizer.model, "summarizer ready");
                Some(Arc::new(p))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "summarizer disabled; compaction will use the fallback summary"
                );
                None
            }
        };

    let tokens = Arc::new(InMemoryTokenStore::new());

    Ok(AppState::new(config, provider, summarizer, transcripts, tokens))
}

/// Locate the agent's transcripts: `<projects_dir>/<project key of workdir>`.
pub fn build_transcript_store(config: &Config) -> anyhow::Result<TranscriptStore> {
    let workdir = match &config.agent.workdir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("resolving working directory")?,
    };
    let projects_dir = match &config.agent.projects_dir {
        Some(dir) => dir.clone(),
        None => default_projects_dir()?,
    };
    Ok(TranscriptStore::new(&projects_dir, &workdir))
}

fn default_projects_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().context("no home directory; set agent.projects_dir")?;
    Ok(home.join(".claude").join("projects"))
}
