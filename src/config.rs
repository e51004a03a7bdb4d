// src/config.rs
// Process configuration, loaded once at startup and passed by reference.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ChatError;

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Messages returned per transcript response.
    pub history_limit: usize,
    pub llm: LlmConfig,
}

/// Upstream LLM endpoint configuration, fixed at gateway construction.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub presence_penalty: f32,
    /// Total duration budget for one HTTP call, streaming included.
    pub request_timeout: Duration,
    /// Total attempt count for transient failures.
    pub max_retries: u32,
    /// Backoff unit; attempt N sleeps N x this before retrying.
    pub retry_delay: Duration,
}

fn env_var_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

impl Config {
    /// Load configuration from the environment (and `.env` if present).
    /// Fails fast when the upstream credential is missing instead of
    /// failing on the first request.
    pub fn from_env() -> Result<Self, ChatError> {
        let _ = dotenvy::dotenv();

        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| ChatError::Config("LLM_API_KEY is not set".to_string()))?;

        Ok(Self {
            host: env_var_or("RIPOSTE_HOST", "127.0.0.1".to_string()),
            port: env_var_or("RIPOSTE_PORT", 8080),
            database_url: env_var_or("DATABASE_URL", "sqlite:./riposte.db".to_string()),
            history_limit: env_var_or("RIPOSTE_HISTORY_LIMIT", 10),
            llm: LlmConfig {
                base_url: env_var_or("LLM_BASE_URL", "https://openrouter.ai/api/v1".to_string()),
                api_key,
                model: env_var_or("LLM_MODEL", "deepseek/deepseek-r1-0528:free".to_string()),
                temperature: env_var_or("LLM_TEMPERATURE", 0.7),
                max_tokens: env_var_or("LLM_MAX_TOKENS", 1024),
                presence_penalty: env_var_or("LLM_PRESENCE_PENALTY", 0.0),
                request_timeout: Duration::from_secs(env_var_or("LLM_TIMEOUT_SECS", 120)),
                max_retries: env_var_or("LLM_MAX_RETRIES", 3),
                retry_delay: Duration::from_millis(env_var_or("LLM_RETRY_DELAY_MS", 1000)),
            },
        })
    }
}
