pub mod chat;
pub mod error;
pub mod health;
pub mod history;
pub mod sessions;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub use error::ApiError;

/// Build the full API router.
///
/// Transport layers (CORS, rate limiting, concurrency limit) are added by
/// the server on top of this.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Chat (core runtime)
        .route("/v1/chat", post(chat::chat))
        .route("/v1/chat/stream", post(chat::chat_stream))
        // Sessions
        .route("/v1/history/:session_id", get(history::get_history))
        .route("/v1/sessions/:session_id/stop", post(sessions::stop_session))
        // Health
        .route("/v1/health", get(health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
