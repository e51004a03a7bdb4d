// src/error.rs
// Standardized error types for the chat core

use thiserror::Error;

/// Errors produced by the chat core and its collaborators.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("No conversation {0} found")]
    NotFound(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("unexpected upstream response shape: {0}")]
    Protocol(String),

    #[error("upstream returned an empty completion")]
    EmptyResponse,

    #[error("upstream stream produced no content")]
    EmptyStream,

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChatError>;
