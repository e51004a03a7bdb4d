// src/llm/gateway.rs
// OpenAI-compatible chat-completion gateway: blocking + streaming calls,
// retry with linear backoff on transient failures.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::LlmConfig;
use crate::error::ChatError;

use super::sse::DataLineDecoder;
use super::{ChatMessage, DeltaStream, LlmBackend};

pub struct OpenAiGateway {
    client: Client,
    config: LlmConfig,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    presence_penalty: f32,
    stream: bool,
}

impl<'a> CompletionRequest<'a> {
    fn new(config: &'a LlmConfig, messages: &'a [ChatMessage], stream: bool) -> Self {
        Self {
            model: &config.model,
            messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            presence_penalty: config.presence_penalty,
            stream,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiGateway {
    pub fn new(config: LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }

    /// POST the request, retrying transient failures (connect/timeout
    /// errors, 429, 5xx) up to `max_retries` total attempts. Attempt N
    /// sleeps N x `retry_delay` before the next try. Anything else fails
    /// immediately.
    async fn send_with_retry(
        &self,
        request_id: &str,
        body: &CompletionRequest<'_>,
    ) -> Result<reqwest::Response, ChatError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let max_attempts = self.config.max_retries.max(1);
        let mut attempt = 1u32;

        loop {
            let sent = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.config.api_key))
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await;

            let cause = match sent {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let error_body = response.text().await.unwrap_or_default();
                    if status.as_u16() != 429 && !status.is_server_error() {
                        return Err(ChatError::Upstream(format!(
                            "API error {status}: {error_body}"
                        )));
                    }
                    format!("API error {status}: {error_body}")
                }
                Err(e) if e.is_connect() || e.is_timeout() => e.to_string(),
                Err(e) => return Err(ChatError::Upstream(e.to_string())),
            };

            if attempt >= max_attempts {
                return Err(ChatError::Upstream(format!(
                    "giving up after {attempt} attempts: {cause}"
                )));
            }
            warn!(
                request_id = %request_id,
                attempt,
                error = %cause,
                "transient upstream failure, backing off"
            );
            tokio::time::sleep(self.config.retry_delay * attempt).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiGateway {
    #[instrument(skip(self, history), fields(model = %self.config.model, message_count = history.len()))]
    async fn complete(&self, history: Vec<ChatMessage>) -> Result<String, ChatError> {
        let request_id = Uuid::new_v4().to_string();
        let body = CompletionRequest::new(&self.config, &history, false);
        debug!(request_id = %request_id, "sending completion request");

        let response = self.send_with_retry(&request_id, &body).await?;
        let text = response
            .text()
            .await
            .map_err(|e| ChatError::Upstream(format!("failed to read response body: {e}")))?;

        let parsed: CompletionResponse = serde_json::from_str(&text)
            .map_err(|e| ChatError::Protocol(format!("invalid completion body: {e}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                ChatError::Protocol("missing choices[0].message.content".to_string())
            })?;

        if content.trim().is_empty() {
            return Err(ChatError::EmptyResponse);
        }
        info!(request_id = %request_id, content_len = content.len(), "completion received");
        Ok(content)
    }

    /// Only connection establishment is retried; once deltas are flowing a
    /// failure ends the stream immediately. Retrying a partially consumed
    /// stream would duplicate or lose content.
    #[instrument(skip(self, history), fields(model = %self.config.model, message_count = history.len()))]
    async fn stream(&self, history: Vec<ChatMessage>) -> Result<DeltaStream, ChatError> {
        let request_id = Uuid::new_v4().to_string();
        let body = CompletionRequest::new(&self.config, &history, true);

        let response = self.send_with_retry(&request_id, &body).await?;
        info!(request_id = %request_id, "upstream stream opened");

        let stream = try_stream! {
            let mut bytes = response.bytes_stream();
            let mut decoder = DataLineDecoder::new();
            'read: while let Some(chunk) = bytes.next().await {
                let chunk = chunk
                    .map_err(|e| ChatError::Upstream(format!("stream interrupted: {e}")))?;
                for payload in decoder.feed(&chunk) {
                    if payload == "[DONE]" {
                        debug!(request_id = %request_id, "upstream stream complete");
                        break 'read;
                    }
                    let frame: StreamChunk = match serde_json::from_str(&payload) {
                        Ok(f) => f,
                        Err(e) => {
                            warn!(request_id = %request_id, error = %e, "skipping unparseable stream frame");
                            continue;
                        }
                    };
                    let content = frame
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.delta.content);
                    if let Some(content) = content {
                        if !content.is_empty() {
                            yield content;
                        }
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}
