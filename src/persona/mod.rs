// src/persona/mod.rs
// Persona instructions prepended to the LLM-facing history.
// Exactly one persona ships today; the instruction text is injected at
// construction so an alternate persona is a config change, not a code change.

mod debate;

pub use debate::DEBATE_PERSONA_PROMPT;

use crate::llm::ChatMessage;

/// A fixed system instruction applied to every conversation history.
#[derive(Debug, Clone)]
pub struct Persona {
    instructions: String,
}

impl Persona {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
        }
    }

    /// The shipped persona: an oppositional debate champion.
    pub fn debate() -> Self {
        Self::new(DEBATE_PERSONA_PROMPT)
    }

    /// Prepend the persona instruction to `history`, leaving the rest
    /// untouched. Pure; no side effects.
    pub fn format(&self, history: Vec<ChatMessage>) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(self.instructions.clone()));
        messages.extend(history);
        messages
    }
}
