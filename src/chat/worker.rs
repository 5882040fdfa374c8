//! Chat worker thread
//!
//! The voice loop must never block on the network, so chat requests are
//! handed to a worker thread that owns a tokio runtime and the `ChatClient`.
//! Results come back to the loop as `LoopEvent::Reply` and
//! `LoopEvent::HealthChecked`.

use crate::chat::client::ChatClient;
use crate::events::{EventSender, LoopEvent};
use crate::messages::ConversationMessage;
use crate::{AvatarError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread;
use tokio::runtime::Runtime;
use tracing::{debug, error, info};

/// How the coordinator reaches the chat endpoint
///
/// Both calls return immediately; the outcome arrives later as a loop event.
/// An `Err` means the request could not be issued at all.
pub trait ChatBackend: Send {
    /// Ask for a reply to the full history (one `LoopEvent::Reply` follows)
    fn request(&mut self, history: Vec<ConversationMessage>) -> Result<()>;

    /// Check the endpoint (one `LoopEvent::HealthChecked` follows)
    fn check_health(&mut self) -> Result<()>;
}

/// Commands for the chat worker
#[derive(Debug)]
pub enum ChatCommand {
    Send(Vec<ConversationMessage>),
    HealthCheck,
    Shutdown,
}

/// Handle to the chat worker thread
pub struct ChatWorker {
    command_tx: Sender<ChatCommand>,
}

impl ChatWorker {
    /// Start the worker thread
    pub fn spawn(client: ChatClient, event_tx: EventSender) -> Result<Self> {
        let (command_tx, command_rx) = bounded(16);

        thread::Builder::new()
            .name("chat-worker".to_string())
            .spawn(move || run_worker(client, command_rx, event_tx))
            .map_err(|e| AvatarError::ChannelError(format!("Failed to spawn chat worker: {}", e)))?;

        Ok(Self { command_tx })
    }

    fn send_command(&self, command: ChatCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| AvatarError::ChannelError(format!("Failed to send chat command: {}", e)))
    }
}

impl ChatBackend for ChatWorker {
    fn request(&mut self, history: Vec<ConversationMessage>) -> Result<()> {
        self.send_command(ChatCommand::Send(history))
    }

    fn check_health(&mut self) -> Result<()> {
        self.send_command(ChatCommand::HealthCheck)
    }
}

impl Drop for ChatWorker {
    fn drop(&mut self) {
        let _ = self.command_tx.send(ChatCommand::Shutdown);
    }
}

fn run_worker(client: ChatClient, command_rx: Receiver<ChatCommand>, event_tx: EventSender) {
    info!("Chat worker starting");

    let runtime = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            // Keep the turn cycle moving: every request gets the apology
            for command in command_rx.iter() {
                let event = match command {
                    ChatCommand::Send(_) => LoopEvent::Reply(client.fallback_reply().to_string()),
                    ChatCommand::HealthCheck => LoopEvent::HealthChecked(false),
                    ChatCommand::Shutdown => break,
                };
                if event_tx.send(event).is_err() {
                    break;
                }
            }
            return;
        }
    };

    loop {
        let event = match command_rx.recv() {
            Ok(ChatCommand::Send(history)) => {
                debug!("Processing chat request ({} messages)", history.len());
                LoopEvent::Reply(runtime.block_on(client.send(&history)))
            }
            Ok(ChatCommand::HealthCheck) => {
                LoopEvent::HealthChecked(runtime.block_on(client.health_check()))
            }
            Ok(ChatCommand::Shutdown) => {
                info!("Chat worker shutting down");
                break;
            }
            Err(_) => {
                debug!("Chat command channel closed");
                break;
            }
        };

        if event_tx.send(event).is_err() {
            debug!("Voice loop gone, stopping chat worker");
            break;
        }
    }

    info!("Chat worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test(flavor = "multi_thread")]
    async fn test_worker_delivers_reply_event() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Hi"}}]
            })))
            .mount(&server)
            .await;

        let client = ChatClient::new(server.uri(), Duration::from_secs(5), "Sorry!").unwrap();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let mut worker = ChatWorker::spawn(client, event_tx).unwrap();

        worker
            .request(vec![ConversationMessage::user("Hello")])
            .unwrap();

        let event = tokio::task::spawn_blocking(move || event_rx.recv_timeout(Duration::from_secs(5)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, LoopEvent::Reply("Hi".to_string()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_worker_reports_failed_health_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/test"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = ChatClient::new(server.uri(), Duration::from_secs(5), "Sorry!").unwrap();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let mut worker = ChatWorker::spawn(client, event_tx).unwrap();

        worker.check_health().unwrap();

        let event = tokio::task::spawn_blocking(move || event_rx.recv_timeout(Duration::from_secs(5)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, LoopEvent::HealthChecked(false));
    }
}
