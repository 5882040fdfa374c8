//! Conversation history and the displayed chat transcript

pub mod storage;
pub mod types;

pub use storage::ChatTranscript;
pub use types::{Author, ChatEntry, Conversation, ConversationMessage, Role};
