use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::time::Duration;

use super::traits::Model;
use super::types::{ChatRequest, DeltaStream, MessageRole};

const DEMO_MODEL_NAME: &str = "demo";

/// Offline model that streams a canned reply word by word
pub struct DemoModel {
    pacing: Duration,
}

impl DemoModel {
    pub fn new(pacing: Duration) -> Self {
        Self { pacing }
    }

    /// The full reply the demo streams for a given context message
    pub fn reply_for(context_message: &str) -> String {
        if context_message.is_empty() {
            "Hello! I'm a demo assistant. Add some context first: type a line to add text, \
             or use /file <path> to add a file, then /send to get a response."
                .to_string()
        } else {
            format!(
                "Thank you for providing context! I can see you have shared:\n\n{}\n\n\
                 This is a demo response since no model backend is configured. \
                 With a real backend I would analyze your context and help with it.",
                context_message
            )
        }
    }
}

#[async_trait]
impl Model for DemoModel {
    async fn stream_chat(&self, request: ChatRequest) -> Result<DeltaStream> {
        let context_message = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let reply = Self::reply_for(context_message);
        let words: Vec<&str> = reply.split_whitespace().collect();
        let last = words.len().saturating_sub(1);
        let chunks: Vec<String> = words
            .iter()
            .enumerate()
            .map(|(i, word)| {
                if i < last {
                    format!("{} ", word)
                } else {
                    word.to_string()
                }
            })
            .collect();

        let pacing = self.pacing;
        let deltas = stream::iter(chunks.into_iter().enumerate()).then(move |(i, chunk)| async move {
            if i > 0 && !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }
            Ok::<_, anyhow::Error>(chunk)
        });

        Ok(Box::pin(deltas))
    }

    fn name(&self) -> &str {
        DEMO_MODEL_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatMessage;
    use pretty_assertions::assert_eq;

    fn request(content: &str) -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::user(content)],
            max_tokens: 1000,
        }
    }

    #[tokio::test]
    async fn test_empty_context_gets_greeting() {
        let model = DemoModel::new(Duration::ZERO);
        let chunks: Vec<String> = model
            .stream_chat(request(""))
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;

        assert!(chunks[0].starts_with("Hello!"));
        assert!(!chunks.last().unwrap().ends_with(' '));
    }

    #[tokio::test]
    async fn test_words_rejoin_with_single_spaces() {
        let model = DemoModel::new(Duration::ZERO);
        let joined: String = model
            .stream_chat(request("alpha beta"))
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;

        let expected = DemoModel::reply_for("alpha beta")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(joined, expected);
        assert!(joined.contains("alpha beta"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_words() {
        let model = DemoModel::new(Duration::from_millis(50));
        let start = tokio::time::Instant::now();

        let count = model.stream_chat(request("")).await.unwrap().count().await;

        let words = DemoModel::reply_for("").split_whitespace().count();
        assert_eq!(count, words);
        assert!(start.elapsed() >= Duration::from_millis(50) * (words as u32 - 1));
    }
}
