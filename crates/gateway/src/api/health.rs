use axum::extract::State;
use axum::response::Json;

use crate::state::AppState;

/// `GET /v1/health`
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "provider": state.provider.provider_id(),
        "summarizer": state.summarizer.as_ref().map(|s| s.provider_id()),
        "active_runs": state.cancel_map.active_runs(),
    }))
}
