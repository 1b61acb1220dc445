//! `GET /v1/history/:session_id` — a session's user/assistant messages.

use axum::extract::{Path, State};
use axum::response::Json;

use relay_sessions::HistoryMessage;

use crate::state::AppState;

use super::error::ApiError;

/// Returns `[]` when the session has no transcript.
pub async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<HistoryMessage>>, ApiError> {
    let history = state.transcripts.read_history_async(&session_id).await?;
    Ok(Json(history))
}
