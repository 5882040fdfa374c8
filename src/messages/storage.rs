use super::types::{Author, ChatEntry};
use parking_lot::RwLock;
use std::sync::Arc;

/// Displayed chat lines, written by the coordinator and read by the UI
#[derive(Debug, Clone)]
pub struct ChatTranscript {
    entries: Arc<RwLock<Vec<ChatEntry>>>,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn add(&self, author: Author, text: impl Into<String>) {
        self.entries.write().push(ChatEntry::new(author, text));
    }

    pub fn get_all(&self) -> Vec<ChatEntry> {
        self.entries.read().clone()
    }

    /// Text of the most recent line from `author`
    pub fn last_from(&self, author: Author) -> Option<String> {
        self.entries
            .read()
            .iter()
            .rev()
            .find(|entry| entry.author == author)
            .map(|entry| entry.text.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for ChatTranscript {
    fn default() -> Self {
        Self::new()
    }
}
