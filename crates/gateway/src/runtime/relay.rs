//! One chat request, end to end: compaction check, provider request, and
//! the session bookkeeping that follows the run's events.

use serde_json::Number;
use tokio_util::sync::DropGuard;

use relay_domain::config::AgentConfig;
use relay_domain::error::Result;
use relay_domain::event::AgentEvent;
use relay_domain::trace::TraceEvent;
use relay_providers::traits::QueryRequest;

use crate::state::AppState;

use super::compact;
use super::run::{start_run, AgentRun, RunOptions};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ChatTurn — a validated request
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub message: String,
    /// Provider session to continue. `None` starts a new one.
    pub session_id: Option<String>,
    /// Caller id, passed to the agent as context.
    pub user_id: Number,
    pub model: Option<String>,
    pub max_turns: Option<u32>,
    /// Replaces the configured system prompt for this request.
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Per-request compaction threshold.
    pub session_max_tokens: Option<u64>,
}

impl ChatTurn {
    pub fn new(message: impl Into<String>, user_id: Number) -> Self {
        Self {
            message: message.into(),
            session_id: None,
            user_id,
            model: None,
            max_turns: None,
            system_prompt: None,
            temperature: None,
            max_tokens: None,
            session_max_tokens: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ActiveRun — a run plus its session bookkeeping
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A started run. Dropping it aborts the run, which is how a client
/// disconnect reaches the provider.
pub struct ActiveRun {
    run: AgentRun,
    state: AppState,
    session_id: Option<String>,
    compacted: bool,
    _abort_on_drop: DropGuard,
}

impl ActiveRun {
    pub fn run_id(&self) -> &str {
        self.run.run_id()
    }

    /// The session this run is attached to: the resumed one until the
    /// provider reports its own.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Whether the request's session was compacted into a fresh one.
    pub fn compacted(&self) -> bool {
        self.compacted
    }

    /// Pull the next event, recording session state it carries.
    pub async fn next(&mut self) -> Option<AgentEvent> {
        let event = self.run.next().await?;
        match &event {
            AgentEvent::Init { session_id } if !session_id.is_empty() => {
                self.state
                    .cancel_map
                    .bind_session(session_id, self.run.run_id());
                self.session_id = Some(session_id.clone());
            }
            AgentEvent::Done {
                session_id,
                input_tokens,
            } => {
                if !session_id.is_empty() {
                    self.session_id = Some(session_id.clone());
                }
                if *input_tokens > 0 {
                    if let Some(target) = self.session_id.as_deref() {
                        self.state.tokens.set(target, *input_tokens).await;
                    }
                }
            }
            _ => {}
        }
        Some(event)
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.state.cancel_map.remove(self.run.run_id());
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// start_turn
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compact if needed, then start the run.
///
/// Errors only when the provider refuses the request before producing
/// anything. A failed summary abandons compaction instead.
pub async fn start_turn(state: &AppState, turn: ChatTurn) -> Result<ActiveRun> {
    let config = &state.config;

    let mut prompt = turn.message.clone();
    let mut resume = turn.session_id.clone().filter(|s| !s.is_empty());
    let mut compacted = false;

    if let Some(session_id) = resume.clone() {
        if let Some(summary) = compaction_summary(state, &session_id, &turn).await {
            prompt = compact::compacted_prompt(&summary, &turn.message);
            state.tokens.clear(&session_id).await;
            resume = None;
            compacted = true;
        }
    }

    let run_id = uuid::Uuid::new_v4().to_string();
    let query = QueryRequest {
        prompt,
        resume: resume.clone(),
        model: turn.model.clone().or_else(|| config.agent.model.clone()),
        max_turns: Some(turn.max_turns.unwrap_or(config.agent.max_turns)),
        system_prompt: Some(system_prompt(&config.agent, &turn)),
        temperature: turn.temperature,
        max_tokens: turn.max_tokens,
        allowed_tools: config.agent.allowed_tools.clone(),
        permission_mode: Some(config.agent.permission_mode),
        mcp_config: config.agent.mcp_config.clone(),
    };

    let cancel = state.cancel_map.register(&run_id);
    if let Some(ref session_id) = resume {
        state.cancel_map.bind_session(session_id, &run_id);
    }

    let opts = RunOptions {
        run_id: run_id.clone(),
        query,
        heartbeat: std::time::Duration::from_secs(config.agent.heartbeat_secs),
        buffer: config.agent.event_buffer,
    };

    let run = match start_run(state.provider.clone(), opts, cancel.clone()).await {
        Ok(run) => run,
        Err(e) => {
            state.cancel_map.remove(&run_id);
            return Err(e);
        }
    };

    tracing::info!(
        run_id = %run_id,
        session_id = resume.as_deref().unwrap_or(""),
        compacted,
        "run started"
    );

    Ok(ActiveRun {
        run,
        state: state.clone(),
        session_id: resume,
        compacted,
        _abort_on_drop: cancel.drop_guard(),
    })
}

/// The summary to compact `session_id` with, or `None` to continue the
/// session as is.
async fn compaction_summary(state: &AppState, session_id: &str, turn: &ChatTurn) -> Option<String> {
    let cfg = &state.config.compaction;
    if !cfg.enabled {
        return None;
    }

    let threshold = turn.session_max_tokens.unwrap_or(cfg.threshold_tokens);
    if !compact::should_compact(
        session_id,
        state.tokens.as_ref(),
        &state.transcripts,
        threshold,
        cfg.bytes_per_token,
    )
    .await
    {
        return None;
    }

    let recorded_tokens = state.tokens.get(session_id).await;
    let summary = match compact::generate_summary(
        session_id,
        &state.transcripts,
        state.summarizer.as_deref(),
        cfg,
    )
    .await
    {
        Ok(summary) if !summary.trim().is_empty() => summary,
        Ok(_) => {
            tracing::warn!(session_id = session_id, "empty summary, continuing without compaction");
            return None;
        }
        Err(e) => {
            tracing::warn!(
                session_id = session_id,
                error = %e,
                "summary failed, continuing without compaction"
            );
            return None;
        }
    };

    TraceEvent::CompactionTriggered {
        session_id: session_id.to_owned(),
        recorded_tokens,
        summary_chars: summary.chars().count(),
    }
    .emit();
    Some(summary)
}

/// System prompt for one request: the request's own (or the configured
/// one) followed by the caller context.
fn system_prompt(agent: &AgentConfig, turn: &ChatTurn) -> String {
    let user_line = format!("The current user's id is {}.", turn.user_id);
    let base = turn
        .system_prompt
        .as_deref()
        .or(agent.system_prompt.as_deref())
        .filter(|s| !s.trim().is_empty());
    match base {
        Some(base) => format!("{base}\n\n{user_line}"),
        None => user_line,
    }
}
