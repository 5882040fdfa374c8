//! Remote chat endpoint
//!
//! This module provides:
//! - An HTTP client for the chat completion and health endpoints
//! - A background worker that runs the client off the voice loop

pub mod client;
pub mod worker;

pub use client::ChatClient;
pub use worker::{ChatBackend, ChatCommand, ChatWorker};
