// src/llm/mod.rs
// Upstream LLM abstraction: one capability trait, two completion modes.

mod chunk;
mod gateway;
mod sse;

pub use chunk::{chunk_stream, ChunkAssembler, FLUSH_THRESHOLD};
pub use gateway::OpenAiGateway;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// One role/content entry in the LLM-facing conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Lazy sequence of raw content deltas from the upstream stream.
/// Single-pass and non-restartable; consuming it twice is a programmer error.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

/// Capability interface over the upstream chat-completion endpoint.
/// Callers depend on this, not on a concrete transport.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Blocking completion: returns the full generated text.
    async fn complete(&self, history: Vec<ChatMessage>) -> Result<String, ChatError>;

    /// Streaming completion: opens one long-lived connection and yields
    /// content fragments as they arrive.
    async fn stream(&self, history: Vec<ChatMessage>) -> Result<DeltaStream, ChatError>;
}
