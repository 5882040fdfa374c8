//! Voice avatar chatbot
//!
//! Listens for speech, sends each final transcript to a chat endpoint, and
//! speaks the reply while an animated avatar shows what the loop is doing.

pub mod backends;
pub mod chat;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod messages;
pub mod runtime;
pub mod speech;
pub mod state;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod timer;
pub mod ui;

pub use error::{AvatarError, Result};
