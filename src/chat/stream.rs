// src/chat/stream.rs
// Orchestrates one streaming turn: upstream deltas -> assembled chunks ->
// client channel, with the accumulated reply persisted at stream end.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::ChatError;
use crate::llm::chunk_stream;

use super::service::ChatService;
use super::types::Message;

/// Events emitted over one streaming turn, in order:
/// `Start`, `Chunk`*, `Final`, `End` - or `Error` in place of the remainder.
#[derive(Debug)]
pub enum TurnEvent {
    Start,
    Chunk { part: u32, text: String },
    Final { transcript: Vec<Message> },
    End,
    Error { message: String },
}

/// Drive a streaming turn to completion, writing events to `tx`.
///
/// The conversation and the user message are already persisted by the
/// caller; this only ever appends the bot message, and only when the whole
/// chunk sequence was delivered. A failed send means the client went away:
/// the upstream stream is abandoned and nothing further is persisted.
pub async fn run_streaming_turn(
    service: Arc<ChatService>,
    conversation_id: String,
    tx: mpsc::Sender<TurnEvent>,
) {
    if tx.send(TurnEvent::Start).await.is_err() {
        return;
    }
    match stream_turn(&service, &conversation_id, &tx).await {
        Ok(true) => {
            let _ = tx.send(TurnEvent::End).await;
        }
        Ok(false) => {
            info!(conversation_id = %conversation_id, "client disconnected mid-stream");
        }
        Err(e) => {
            warn!(conversation_id = %conversation_id, error = %e, "streaming turn failed");
            let _ = tx
                .send(TurnEvent::Error {
                    message: e.to_string(),
                })
                .await;
        }
    }
}

/// Returns `Ok(false)` when the receiver disappeared mid-turn.
async fn stream_turn(
    service: &ChatService,
    conversation_id: &str,
    tx: &mpsc::Sender<TurnEvent>,
) -> Result<bool, ChatError> {
    let history = service.history_for_llm(conversation_id).await?;
    let deltas = service.gateway.stream(service.persona.format(history)).await?;
    let chunks = chunk_stream(deltas);
    futures::pin_mut!(chunks);

    let mut part = 1u32;
    let mut accumulated = String::new();
    while let Some(chunk) = chunks.next().await {
        let text = chunk?;
        accumulated.push_str(&text);
        if tx.send(TurnEvent::Chunk { part, text }).await.is_err() {
            return Ok(false);
        }
        part += 1;
    }

    service.record_bot_message(conversation_id, &accumulated).await?;
    info!(
        conversation_id = %conversation_id,
        parts = part - 1,
        reply_len = accumulated.len(),
        "streamed reply persisted"
    );

    let transcript = service.transcript(conversation_id).await?;
    if tx.send(TurnEvent::Final { transcript }).await.is_err() {
        return Ok(false);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;
    use sqlx::sqlite::SqlitePoolOptions;

    use crate::chat::{ChatStore, Role};
    use crate::llm::{ChatMessage, DeltaStream, LlmBackend};
    use crate::persona::Persona;

    /// Gateway double: replays canned fragments, or fails.
    struct ScriptedBackend {
        fragments: Vec<&'static str>,
        fail_mid_stream: bool,
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn complete(&self, _history: Vec<ChatMessage>) -> Result<String, ChatError> {
            Ok(self.fragments.concat())
        }

        async fn stream(&self, _history: Vec<ChatMessage>) -> Result<DeltaStream, ChatError> {
            let mut items: Vec<Result<String, ChatError>> = self
                .fragments
                .iter()
                .map(|s| Ok(s.to_string()))
                .collect();
            if self.fail_mid_stream {
                items.push(Err(ChatError::Upstream("connection reset".to_string())));
            }
            Ok(Box::pin(stream::iter(items)))
        }
    }

    async fn service_with(backend: ScriptedBackend) -> (Arc<ChatService>, String) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .expect("in-memory sqlite");
        let store = ChatStore::new(pool);
        store.init_schema().await.expect("schema");

        let conversation = store.create_conversation().await.unwrap();
        store
            .add_message(&conversation.id, "my claim", Role::User)
            .await
            .unwrap();

        let service = Arc::new(ChatService::new(
            store,
            Arc::new(backend),
            Persona::debate(),
            10,
        ));
        (service, conversation.id)
    }

    async fn collect_events(
        service: Arc<ChatService>,
        conversation_id: String,
    ) -> Vec<TurnEvent> {
        let (tx, mut rx) = mpsc::channel(64);
        let handle = tokio::spawn(run_streaming_turn(service, conversation_id, tx));
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        handle.await.unwrap();
        events
    }

    #[tokio::test]
    async fn test_happy_path_event_sequence() {
        let backend = ScriptedBackend {
            fragments: vec!["Wrong. ", "The data ", "says otherwise!"],
            fail_mid_stream: false,
        };
        let (service, conversation_id) = service_with(backend).await;
        let events = collect_events(service.clone(), conversation_id.clone()).await;

        assert!(matches!(events.first(), Some(TurnEvent::Start)));
        assert!(matches!(events.last(), Some(TurnEvent::End)));

        let mut expected_part = 1;
        let mut accumulated = String::new();
        for event in &events {
            if let TurnEvent::Chunk { part, text } = event {
                assert_eq!(*part, expected_part, "parts must increase strictly");
                expected_part += 1;
                accumulated.push_str(text);
            }
        }
        assert_eq!(accumulated, "Wrong. The data says otherwise!");

        // bot message persisted with the full accumulated text
        let transcript = service.transcript(&conversation_id).await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].role, Role::Bot);
        assert_eq!(transcript[0].content, "Wrong. The data says otherwise!");

        // and the Final event carries the same transcript
        let final_event = events
            .iter()
            .find(|e| matches!(e, TurnEvent::Final { .. }))
            .expect("final event");
        if let TurnEvent::Final { transcript } = final_event {
            assert_eq!(transcript[0].content, "Wrong. The data says otherwise!");
        }
    }

    #[tokio::test]
    async fn test_mid_stream_failure_drops_partial_reply() {
        let backend = ScriptedBackend {
            fragments: vec!["Partially. "],
            fail_mid_stream: true,
        };
        let (service, conversation_id) = service_with(backend).await;
        let events = collect_events(service.clone(), conversation_id.clone()).await;

        assert!(matches!(events.first(), Some(TurnEvent::Start)));
        let error = events
            .iter()
            .find_map(|e| match e {
                TurnEvent::Error { message } => Some(message.clone()),
                _ => None,
            })
            .expect("error event");
        assert!(error.contains("connection reset"));
        assert!(!events.iter().any(|e| matches!(e, TurnEvent::End)));

        // the partial text is dropped: only the user message remains
        let transcript = service.transcript(&conversation_id).await.unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_empty_upstream_stream_is_an_error() {
        let backend = ScriptedBackend {
            fragments: vec![],
            fail_mid_stream: false,
        };
        let (service, conversation_id) = service_with(backend).await;
        let events = collect_events(service.clone(), conversation_id.clone()).await;

        let error = events
            .iter()
            .find_map(|e| match e {
                TurnEvent::Error { message } => Some(message.clone()),
                _ => None,
            })
            .expect("error event");
        assert!(error.contains("no content"));

        let transcript = service.transcript(&conversation_id).await.unwrap();
        assert_eq!(transcript.len(), 1, "no empty bot message may be persisted");
    }

    #[tokio::test]
    async fn test_disconnected_client_persists_nothing() {
        let backend = ScriptedBackend {
            fragments: vec!["One. ", "Two. ", "Three. ", "Four. "],
            fail_mid_stream: false,
        };
        let (service, conversation_id) = service_with(backend).await;

        let (tx, mut rx) = mpsc::channel(1);
        let handle = tokio::spawn(run_streaming_turn(
            service.clone(),
            conversation_id.clone(),
            tx,
        ));
        // take the start event, then hang up
        let _ = rx.recv().await;
        drop(rx);
        handle.await.unwrap();

        let transcript = service.transcript(&conversation_id).await.unwrap();
        assert_eq!(transcript.len(), 1, "abandoned turn must not persist a reply");
        assert_eq!(transcript[0].role, Role::User);
    }
}
