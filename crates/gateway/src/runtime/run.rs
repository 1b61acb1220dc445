//! The agent run loop.
//!
//! [`start_run`] issues the provider request and spawns a producer task that
//! drives the provider's message stream through the translator into a
//! bounded channel. The caller pulls events one at a time from the returned
//! [`AgentRun`]; the producer suspends whenever the channel is full.
//!
//! A run ends in exactly one `done` or `error` event, except when it is
//! cancelled: then it ends with no further events at all.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use relay_domain::error::Result;
use relay_domain::event::AgentEvent;
use relay_domain::message::ProviderMessage;
use relay_domain::stream::BoxStream;
use relay_domain::trace::TraceEvent;
use relay_providers::traits::{AgentProvider, QueryRequest};

use super::heartbeat::Heartbeat;
use super::translate::{tool_result_count, translate};

/// Reported when the provider stream closes before its result message.
pub const INCOMPLETE_RUN_ERROR: &str = "provider stream ended without a result";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Run parameters
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct RunOptions {
    pub run_id: String,
    pub query: QueryRequest,
    /// Interval of the "waiting for provider" log.
    pub heartbeat: Duration,
    /// Capacity of the event channel.
    pub buffer: usize,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AgentRun — the consumer handle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Handle to a running agent run.
pub struct AgentRun {
    run_id: String,
    rx: mpsc::Receiver<AgentEvent>,
    cancel: CancellationToken,
    finished: bool,
}

impl AgentRun {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Pull the next event, or `None` once the run has ended or was
    /// cancelled.
    pub async fn next(&mut self) -> Option<AgentEvent> {
        if self.finished || self.cancel.is_cancelled() {
            return None;
        }
        let event = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.rx.recv() => event,
        };
        // Nothing is delivered after a terminal event, even if the
        // provider keeps its stream open.
        self.finished = event.as_ref().map_or(true, AgentEvent::is_terminal);
        event
    }

    /// Abort the run. No further events are delivered.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Issue the provider request and start producing events.
///
/// Fails without spawning anything when the provider rejects the request
/// outright (e.g. the agent binary cannot be started).
pub async fn start_run(
    provider: Arc<dyn AgentProvider>,
    opts: RunOptions,
    cancel: CancellationToken,
) -> Result<AgentRun> {
    let resume = opts.query.resume.clone();
    let model = opts.query.model.clone();
    let stream = provider.query(opts.query).await?;

    TraceEvent::RunStarted {
        run_id: opts.run_id.clone(),
        resume: resume.clone(),
        model,
    }
    .emit();

    let (tx, rx) = mpsc::channel(opts.buffer.max(1));
    let span = tracing::info_span!(
        "run",
        run_id = %opts.run_id,
        session_id = resume.as_deref().unwrap_or(""),
        provider = provider.provider_id(),
    );

    let producer = Producer {
        run_id: opts.run_id.clone(),
        tx,
        cancel: cancel.clone(),
        heartbeat: opts.heartbeat,
    };
    tokio::spawn(producer.drive(stream).instrument(span));

    Ok(AgentRun {
        run_id: opts.run_id,
        rx,
        cancel,
        finished: false,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Run state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct RunState {
    started: Instant,
    turn: u32,
    last_tool: Option<(String, Instant)>,
    has_streamed_text: bool,
    terminal: Option<&'static str>,
}

impl RunState {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            turn: 1,
            last_tool: None,
            has_streamed_text: false,
            terminal: None,
        }
    }

    /// Bookkeeping for an event about to be forwarded.
    fn observe(&mut self, run_id: &str, event: &AgentEvent) {
        match event {
            AgentEvent::ToolUse { tool_name, .. } => {
                tracing::debug!(tool = %tool_name, turn = self.turn, "tool call started");
                self.last_tool = Some((tool_name.clone(), Instant::now()));
            }
            AgentEvent::ToolResult { .. } => {
                if let Some((tool, at)) = self.last_tool.take() {
                    let duration_ms = at.elapsed().as_millis() as u64;
                    tracing::debug!(tool = %tool, duration_ms, "tool call finished");
                    TraceEvent::ToolFinished {
                        run_id: run_id.to_owned(),
                        tool,
                        duration_ms,
                    }
                    .emit();
                }
            }
            AgentEvent::Text { .. } if !self.has_streamed_text => {
                self.has_streamed_text = true;
                TraceEvent::FirstToken {
                    run_id: run_id.to_owned(),
                    latency_ms: self.started.elapsed().as_millis() as u64,
                }
                .emit();
            }
            AgentEvent::Done { .. } => self.terminal = Some("done"),
            AgentEvent::Error { .. } => self.terminal = Some("error"),
            _ => {}
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Producer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct Producer {
    run_id: String,
    tx: mpsc::Sender<AgentEvent>,
    cancel: CancellationToken,
    heartbeat: Duration,
}

impl Producer {
    async fn drive(self, mut stream: BoxStream<'static, Result<ProviderMessage>>) {
        let mut state = RunState::new();
        let outcome = self.pump(&mut stream, &mut state).await;
        // Dropping the stream aborts the upstream request if it is still open.
        drop(stream);

        tracing::info!(
            outcome,
            turns = state.turn,
            duration_ms = state.started.elapsed().as_millis() as u64,
            "run finished"
        );
        TraceEvent::RunFinished {
            run_id: self.run_id.clone(),
            outcome: outcome.to_owned(),
            turns: state.turn,
            duration_ms: state.started.elapsed().as_millis() as u64,
        }
        .emit();
    }

    /// Drive the stream to its end. Returns the run outcome label.
    async fn pump(
        &self,
        stream: &mut BoxStream<'static, Result<ProviderMessage>>,
        state: &mut RunState,
    ) -> &'static str {
        let mut heartbeat = Heartbeat::start(&self.run_id, state.turn, self.heartbeat);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return state.terminal.unwrap_or("cancelled"),
                next = stream.next() => next,
            };
            heartbeat.stop();

            let msg = match next {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    if let Some(outcome) = state.terminal {
                        tracing::debug!(error = %e, "ignoring provider error after completion");
                        return outcome;
                    }
                    if e.is_cancelled() || self.cancel.is_cancelled() {
                        return "cancelled";
                    }
                    tracing::warn!(error = %e, "provider stream failed");
                    let message = e.to_string();
                    return match self.emit(state, AgentEvent::Error { message }).await {
                        true => "error",
                        false => "disconnected",
                    };
                }
                None => {
                    if let Some(outcome) = state.terminal {
                        return outcome;
                    }
                    if self.cancel.is_cancelled() {
                        return "cancelled";
                    }
                    let event = AgentEvent::Error {
                        message: INCOMPLETE_RUN_ERROR.into(),
                    };
                    return match self.emit(state, event).await {
                        true => "incomplete",
                        false => "disconnected",
                    };
                }
            };

            if state.terminal.is_some() {
                // Drain so the provider can finish cleanly; nothing follows
                // a terminal event.
                tracing::trace!(kind = %msg.kind(), "ignoring provider message after completion");
                continue;
            }

            for event in translate(&msg, state.has_streamed_text) {
                if !self.emit(state, event).await {
                    return self.stopped_outcome();
                }
                if state.terminal.is_some() {
                    break;
                }
            }

            if state.terminal.is_none() && tool_result_count(&msg) > 0 {
                state.turn += 1;
                tracing::debug!(turn = state.turn, "tool results processed, next turn");
                if !self.emit(state, AgentEvent::Turn { turn: state.turn }).await {
                    return self.stopped_outcome();
                }
            }

            if state.terminal.is_none() {
                heartbeat = Heartbeat::start(&self.run_id, state.turn, self.heartbeat);
            }
        }
    }

    /// Forward one event. Returns false when the run was cancelled or the
    /// consumer went away.
    async fn emit(&self, state: &mut RunState, event: AgentEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        state.observe(&self.run_id, &event);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(event) => sent.is_ok(),
        }
    }

    fn stopped_outcome(&self) -> &'static str {
        if self.cancel.is_cancelled() {
            "cancelled"
        } else {
            "disconnected"
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
