// src/chat/service.rs
// Turn execution for the blocking path, plus the shared conversation
// resolution and history projection used by both paths.

use std::sync::Arc;

use tracing::info;

use crate::error::ChatError;
use crate::llm::{ChatMessage, LlmBackend};
use crate::persona::Persona;

use super::store::ChatStore;
use super::types::{Conversation, Message, Role};

pub struct ChatService {
    pub(crate) store: ChatStore,
    pub(crate) gateway: Arc<dyn LlmBackend>,
    pub(crate) persona: Persona,
    history_limit: usize,
}

impl ChatService {
    pub fn new(
        store: ChatStore,
        gateway: Arc<dyn LlmBackend>,
        persona: Persona,
        history_limit: usize,
    ) -> Self {
        Self {
            store,
            gateway,
            persona,
            history_limit,
        }
    }

    /// Look up an existing conversation, or start a fresh one when no id
    /// was supplied. An unknown id is an error, never an implicit create.
    pub async fn resolve_conversation(
        &self,
        conversation_id: Option<&str>,
    ) -> Result<Conversation, ChatError> {
        match conversation_id {
            Some(id) => self.store.get_conversation(id).await,
            None => self.store.create_conversation().await,
        }
    }

    pub async fn record_user_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<Message, ChatError> {
        self.store
            .add_message(conversation_id, content, Role::User)
            .await
    }

    pub(crate) async fn record_bot_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<Message, ChatError> {
        self.store
            .add_message(conversation_id, content, Role::Bot)
            .await
    }

    /// Ascending history in the upstream vocabulary (`bot` -> `assistant`).
    pub async fn history_for_llm(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        let messages = self.store.messages_ascending(conversation_id).await?;
        Ok(to_llm_history(&messages))
    }

    /// Recent transcript, newest first, capped for display.
    pub async fn transcript(&self, conversation_id: &str) -> Result<Vec<Message>, ChatError> {
        self.store
            .messages_descending(conversation_id, self.history_limit)
            .await
    }

    /// One full blocking turn: persist the user message, ask the gateway
    /// for a counter-argument, persist it, return the updated transcript.
    /// The user message commits before any upstream work begins.
    pub async fn run_turn(
        &self,
        conversation_id: Option<&str>,
        message: &str,
    ) -> Result<(Conversation, Vec<Message>), ChatError> {
        let conversation = self.resolve_conversation(conversation_id).await?;
        self.record_user_message(&conversation.id, message).await?;

        let history = self.history_for_llm(&conversation.id).await?;
        let reply = self.gateway.complete(self.persona.format(history)).await?;
        self.record_bot_message(&conversation.id, &reply).await?;
        info!(
            conversation_id = %conversation.id,
            reply_len = reply.len(),
            "turn completed"
        );

        let transcript = self.transcript(&conversation.id).await?;
        Ok((conversation, transcript))
    }
}

pub(crate) fn to_llm_history(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|m| ChatMessage {
            role: m.role.llm_role().to_string(),
            content: m.content.clone(),
        })
        .collect()
}
