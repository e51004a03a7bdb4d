// src/state.rs

use std::sync::Arc;

use crate::chat::ChatService;

/// Shared handles passed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ChatService>,
}
