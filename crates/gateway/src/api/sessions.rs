//! `POST /v1/sessions/:session_id/stop` — abort a session's active run.

use axum::extract::{Path, State};
use axum::response::Json;

use crate::state::AppState;

/// Cancels the run bound to the session. The run's stream closes without a
/// terminal event.
pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<serde_json::Value> {
    let stopped = state.cancel_map.cancel_session(&session_id);
    if stopped {
        tracing::info!(session_id = %session_id, "run stopped by request");
    }
    Json(serde_json::json!({ "stopped": stopped }))
}
