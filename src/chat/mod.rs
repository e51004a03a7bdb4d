// src/chat/mod.rs
// Conversation state: persistence, turn execution, stream orchestration.

mod service;
mod store;
mod stream;
mod types;

pub use service::ChatService;
pub use store::ChatStore;
pub use stream::{run_streaming_turn, TurnEvent};
pub use types::{Conversation, Message, Role};
