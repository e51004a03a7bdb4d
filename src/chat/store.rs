// src/chat/store.rs
// Conversation and message persistence over sqlite.

use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use crate::error::ChatError;

use super::types::{Conversation, Message, Role};

/// Persistence collaborator. Each append commits independently, so a user
/// message survives any later failure in the same turn.
#[derive(Clone)]
pub struct ChatStore {
    pool: SqlitePool,
}

impl ChatStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Bootstrap the schema. Safe to run on every startup.
    pub async fn init_schema(&self) -> Result<(), ChatError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                role TEXT NOT NULL CHECK (role IN ('user', 'bot')),
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation_time
             ON messages(conversation_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn create_conversation(&self) -> Result<Conversation, ChatError> {
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now().timestamp_millis(),
        };
        sqlx::query("INSERT INTO conversations (id, created_at) VALUES (?, ?)")
            .bind(&conversation.id)
            .bind(conversation.created_at)
            .execute(&self.pool)
            .await?;
        debug!(conversation_id = %conversation.id, "conversation created");
        Ok(conversation)
    }

    pub async fn get_conversation(&self, id: &str) -> Result<Conversation, ChatError> {
        let row = sqlx::query("SELECT id, created_at FROM conversations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Conversation {
            id: r.get("id"),
            created_at: r.get("created_at"),
        })
        .ok_or_else(|| ChatError::NotFound(id.to_string()))
    }

    /// Append one message in its own transaction.
    pub async fn add_message(
        &self,
        conversation_id: &str,
        content: &str,
        role: Role,
    ) -> Result<Message, ChatError> {
        let message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now().timestamp_millis(),
        };
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;
        Ok(message)
    }

    /// Full history, oldest first - the LLM-facing order.
    pub async fn messages_ascending(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, ChatError> {
        let rows = sqlx::query(
            "SELECT id, conversation_id, role, content, created_at
             FROM messages WHERE conversation_id = ?
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_message).collect())
    }

    /// Most recent messages first - the API display order.
    pub async fn messages_descending(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, ChatError> {
        let rows = sqlx::query(
            "SELECT id, conversation_id, role, content, created_at
             FROM messages WHERE conversation_id = ?
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?",
        )
        .bind(conversation_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_message).collect())
    }
}

fn row_to_message(row: &SqliteRow) -> Message {
    let role: String = row.get("role");
    Message {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        // the CHECK constraint keeps stored roles well-formed
        role: Role::parse(&role).unwrap_or(Role::Bot),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}
