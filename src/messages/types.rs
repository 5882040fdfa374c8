use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message in the conversation sent to the chat endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single message in the conversation history
///
/// Only role and content are serialized, which is exactly the shape the chat
/// endpoint expects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Append-only conversation history for one session
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<ConversationMessage>,
}

impl Conversation {
    /// Create a history seeded with a system prompt (skipped when blank)
    pub fn new(system_prompt: &str) -> Self {
        let mut messages = Vec::new();
        if !system_prompt.trim().is_empty() {
            messages.push(ConversationMessage::system(system_prompt));
        }
        Self { messages }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ConversationMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ConversationMessage::assistant(content));
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ConversationMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Who a displayed chat line belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Author {
    User,
    Bot,
}

/// A line in the displayed chat transcript
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatEntry {
    pub id: Uuid,
    pub author: Author,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatEntry {
    pub fn new(author: Author, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_seeded_with_system_prompt() {
        let conversation = Conversation::new("Be brief.");
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0].role, Role::System);
        assert_eq!(conversation.messages()[0].content, "Be brief.");
    }

    #[test]
    fn test_blank_system_prompt_is_skipped() {
        let conversation = Conversation::new("   ");
        assert!(conversation.is_empty());
    }

    #[test]
    fn test_conversation_preserves_order() {
        let mut conversation = Conversation::new("");
        conversation.push_user("hello");
        conversation.push_assistant("hi there");

        let roles: Vec<Role> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(conversation.last().map(|m| m.content.as_str()), Some("hi there"));
    }

    #[test]
    fn test_message_serializes_role_and_content_only() {
        let json = serde_json::to_value(ConversationMessage::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_role_names_match_wire_format() {
        for role in [Role::System, Role::User, Role::Assistant] {
            let json = serde_json::to_value(role).unwrap();
            assert_eq!(json, serde_json::json!(role.as_str()));
        }
    }
}
