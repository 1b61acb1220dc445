//! Chat API endpoints: the primary interface for running the agent.
//!
//! - `POST /v1/chat/stream` — SSE: one frame per normalized event
//! - `POST /v1/chat`        — non-streaming: drains the run into one response

use std::convert::Infallible;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use relay_domain::event::AgentEvent;

use crate::runtime::{start_turn, ChatTurn};
use crate::state::AppState;

use super::error::ApiError;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request shape
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Raw request body. `message` and `userId` are checked by hand so that a
/// wrong type gets the same 400 as a missing field.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_turns: Option<u32>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub session_max_tokens: Option<u64>,
}

impl ChatBody {
    pub fn into_turn(self) -> Result<ChatTurn, ApiError> {
        let message = match self.message {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            _ => return Err(ApiError::bad_request("message must be a non-empty string")),
        };
        let user_id = match self.user_id {
            Some(Value::Number(n)) => n,
            _ => return Err(ApiError::bad_request("userId must be a number")),
        };

        Ok(ChatTurn {
            message,
            session_id: self.session_id.filter(|s| !s.is_empty()),
            user_id,
            model: self.model.filter(|s| !s.is_empty()),
            max_turns: self.max_turns.filter(|n| *n > 0),
            system_prompt: self.system_prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens.filter(|n| *n > 0),
            session_max_tokens: self.session_max_tokens.filter(|n| *n > 0),
        })
    }
}

fn parse_body(body: Result<Json<ChatBody>, JsonRejection>) -> Result<ChatTurn, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    body.into_turn()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/chat/stream (SSE)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat_stream(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let turn = parse_body(body)?;

    Ok(Sse::new(make_sse_stream(state, turn))
        .keep_alive(KeepAlive::default())
        .into_response())
}

/// Frames a run as SSE. The connected comment goes out before compaction
/// and the provider launch, so the client sees activity while they run.
/// The run is owned by the stream, so when axum drops the stream on client
/// disconnect the run is aborted.
fn make_sse_stream(
    state: AppState,
    turn: ChatTurn,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        yield Ok(Event::default().comment("connected"));

        let mut run = match start_turn(&state, turn).await {
            Ok(run) => run,
            Err(e) => {
                tracing::warn!(error = %e, "run failed to start");
                let event = AgentEvent::Error { message: e.to_string() };
                if let Some(frame) = to_frame(&event) {
                    yield Ok(frame);
                }
                return;
            }
        };

        while let Some(event) = run.next().await {
            match to_frame(&event) {
                Some(frame) => yield Ok(frame),
                None => tracing::warn!(run_id = run.run_id(), "dropping unencodable event"),
            }
        }
    }
}

fn to_frame(event: &AgentEvent) -> Option<Event> {
    match Event::default().event(event.event_type()).json_data(event) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::warn!(event = event.event_type(), error = %e, "failed to encode event");
            None
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/chat (non-streaming)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub session_id: Option<String>,
    pub content: String,
    pub tool_calls: Vec<Value>,
    pub tool_results: Vec<Value>,
    pub input_tokens: u64,
    pub turns: u32,
    pub errors: Vec<String>,
}

pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let turn = parse_body(body)?;
    let mut run = start_turn(&state, turn).await?;

    let mut reply = ChatReply {
        turns: 1,
        ..Default::default()
    };
    while let Some(event) = run.next().await {
        match event {
            AgentEvent::Text { content } => reply.content.push_str(&content),
            AgentEvent::ToolUse { tool_name, input } => {
                reply.tool_calls.push(serde_json::json!({
                    "toolName": tool_name,
                    "input": input,
                }));
            }
            AgentEvent::ToolResult { tool_name, result } => {
                reply.tool_results.push(serde_json::json!({
                    "toolName": tool_name,
                    "result": result,
                }));
            }
            AgentEvent::Turn { turn } => reply.turns = turn,
            AgentEvent::Done { input_tokens, .. } => reply.input_tokens = input_tokens,
            AgentEvent::Error { message } => reply.errors.push(message),
            AgentEvent::Init { .. } => {}
        }
    }
    reply.session_id = run.session_id().map(str::to_owned);

    Ok(Json(reply))
}
