use anyhow::Result;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
}

/// One role/content pair sent to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// A streaming chat-completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Ordered conversation sent to the model
    pub messages: Vec<ChatMessage>,
    /// Ceiling on generated tokens
    pub max_tokens: usize,
}

/// Ordered text deltas from the backend, ending normally or with an error
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;
