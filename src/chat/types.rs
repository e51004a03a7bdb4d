// src/chat/types.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Who authored a message. The wire and the database both use
/// `"user"`/`"bot"`; only the LLM-facing projection says `"assistant"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
        }
    }

    /// Role name in the upstream API vocabulary.
    pub fn llm_role(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "bot" => Some(Role::Bot),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An append-only collection of messages. The id is assigned at creation
/// and never changes.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    pub created_at: i64,
}

/// One persisted turn entry. Immutable once stored.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    /// Unix milliseconds; non-decreasing within a conversation.
    pub created_at: i64,
}
