//! HTTP client for the chat completion endpoint

use crate::config::AppConfig;
use crate::messages::ConversationMessage;
use crate::{AvatarError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Path of the chat completion endpoint
pub const CHAT_PATH: &str = "/api/chat";

/// Path of the health endpoint
pub const HEALTH_PATH: &str = "/api/test";

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ConversationMessage],
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct HealthResponse {
    #[serde(default)]
    status: String,
}

/// Client for the remote chat endpoint
///
/// `send` never fails: any problem with the request or the response is
/// logged and replaced by the configured apology.
#[derive(Clone, Debug)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    fallback_reply: String,
}

impl ChatClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        fallback_reply: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AvatarError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            fallback_reply: fallback_reply.into(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.server.base_url.clone(),
            Duration::from_millis(config.server.request_timeout_ms),
            config.conversation.fallback_reply.clone(),
        )
    }

    pub fn fallback_reply(&self) -> &str {
        &self.fallback_reply
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send the history and return the reply, or the apology on any failure
    pub async fn send(&self, history: &[ConversationMessage]) -> String {
        match self.try_send(history).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Chat request failed: {}", e);
                self.fallback_reply.clone()
            }
        }
    }

    /// Send the history and return the trimmed reply text
    pub async fn try_send(&self, history: &[ConversationMessage]) -> Result<String> {
        debug!("Sending {} messages to {}", history.len(), CHAT_PATH);

        let response = self
            .client
            .post(self.url(CHAT_PATH))
            .json(&ChatRequest { messages: history })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AvatarError::ChatError(format!("HTTP {}", status)));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| AvatarError::ChatError(format!("Malformed response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AvatarError::ChatError("Response has no reply content".to_string()))
    }

    /// True when the health endpoint answers `{"status": "ok"}`
    pub async fn health_check(&self) -> bool {
        let response = match self.client.get(self.url(HEALTH_PATH)).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Health check failed: {}", e);
                return false;
            }
        };

        if !response.status().is_success() {
            warn!("Health check returned HTTP {}", response.status());
            return false;
        }

        match response.json::<HealthResponse>().await {
            Ok(health) => health.status == "ok",
            Err(e) => {
                warn!("Health check returned malformed body: {}", e);
                false
            }
        }
    }
}
