// src/api/routes.rs
// HTTP router composition.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::chat::{chat, chat_stream, welcome};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/chat", post(chat))
        .route("/chat/stream", post(chat_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
