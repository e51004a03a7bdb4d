// src/api/chat.rs
// Chat endpoints: one blocking, one streaming over SSE.
//
// The streaming endpoint commits its HTTP status before generation starts,
// so failures past that point are delivered as in-band `error` events; the
// response itself is always 200.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use crate::chat::{run_streaming_turn, Message, TurnEvent};
use crate::state::AppState;

use super::error::ApiError;

/// Parameters for sending a message. Without a conversation id a new
/// conversation is started.
#[derive(Debug, Deserialize)]
pub struct SendMessageParams {
    pub conversation_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub role: String,
    pub message: String,
}

/// Conversation id plus recent messages, newest first.
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation_id: String,
    pub message: Vec<MessageResponse>,
}

fn to_response_messages(messages: Vec<Message>) -> Vec<MessageResponse> {
    messages
        .into_iter()
        .map(|m| MessageResponse {
            role: m.role.to_string(),
            message: m.content,
        })
        .collect()
}

pub async fn welcome() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Welcome to chatbot debate, go to /chat to get started"
    }))
}

/// Blocking turn: the whole counter-argument in one response.
pub async fn chat(
    State(state): State<AppState>,
    Json(params): Json<SendMessageParams>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let (conversation, transcript) = state
        .service
        .run_turn(params.conversation_id.as_deref(), &params.message)
        .await?;
    Ok(Json(ConversationResponse {
        conversation_id: conversation.id,
        message: to_response_messages(transcript),
    }))
}

/// Streaming turn. Conversation resolution and the user-message write
/// happen before the stream begins, so an unknown id is still a real 404.
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(params): Json<SendMessageParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let conversation = state
        .service
        .resolve_conversation(params.conversation_id.as_deref())
        .await?;
    state
        .service
        .record_user_message(&conversation.id, &params.message)
        .await?;
    info!(conversation_id = %conversation.id, "starting streamed turn");

    let (tx, rx) = mpsc::channel::<TurnEvent>(64);
    tokio::spawn(run_streaming_turn(
        state.service.clone(),
        conversation.id.clone(),
        tx,
    ));

    let conversation_id = conversation.id;
    let stream = ReceiverStream::new(rx)
        .map(move |event| Ok::<_, Infallible>(sse_event(&conversation_id, event)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn sse_event(conversation_id: &str, event: TurnEvent) -> Event {
    match event {
        TurnEvent::Start => Event::default().event("start"),
        TurnEvent::Chunk { part, text } => Event::default().data(
            json!({
                "conversation_id": conversation_id,
                "message": text,
                "role": "bot",
                "part": part,
            })
            .to_string(),
        ),
        TurnEvent::Final { transcript } => {
            let message: Vec<_> = transcript
                .into_iter()
                .map(|m| json!({ "role": m.role.to_string(), "message": m.content }))
                .collect();
            Event::default().data(
                json!({
                    "conversation_id": conversation_id,
                    "message": message,
                    "part": "final",
                })
                .to_string(),
            )
        }
        TurnEvent::End => Event::default().event("end"),
        TurnEvent::Error { message } => Event::default()
            .event("error")
            .data(json!({ "error": message }).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Role;

    #[test]
    fn test_response_messages_use_wire_roles() {
        let messages = vec![Message {
            id: "1".into(),
            conversation_id: "c".into(),
            role: Role::Bot,
            content: "no".into(),
            created_at: 0,
        }];
        let out = to_response_messages(messages);
        assert_eq!(out[0].role, "bot");
        assert_eq!(out[0].message, "no");
    }
}
