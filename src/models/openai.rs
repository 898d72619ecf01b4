use anyhow::{Context as _, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info};

use super::traits::Model;
use super::types::{ChatRequest, DeltaStream};
use crate::app::ModelSettings;
use crate::constants::{SSE_DATA_PREFIX, SSE_DONE_MARKER};
use crate::utils::MarkError;

/// Streaming client for any OpenAI-compatible chat-completions endpoint
pub struct OpenAiModel {
    client: Client,
    base_url: String,
    model_name: String,
    api_key: Option<String>,
    temperature: Option<f32>,
}

impl OpenAiModel {
    /// Create a new model instance from settings
    pub fn new(settings: &ModelSettings) -> Result<Self> {
        // A missing key is left to the server to reject
        let api_key = std::env::var(&settings.api_key_env).ok();

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(settings.request_timeout_secs))
                .build()
                .context("Failed to build HTTP client")?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model_name: settings.name.clone(),
            api_key,
            temperature: settings.temperature,
        })
    }
}

#[async_trait]
impl Model for OpenAiModel {
    async fn stream_chat(&self, request: ChatRequest) -> Result<DeltaStream> {
        let mut request_body = json!({
            "model": self.model_name,
            "messages": request.messages,
            "stream": true,
            "max_tokens": request.max_tokens,
        });

        if let Some(temp) = self.temperature {
            request_body["temperature"] = json!(temp);
        }

        let url = format!("{}/chat/completions", self.base_url);
        info!(model = %self.model_name, %url, "Starting streaming completion");

        let mut http_request = self.client.post(&url).json(&request_body);
        if let Some(key) = &self.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request
            .send()
            .await
            .with_context(|| format!("Failed to connect to {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(MarkError::Backend(format!("API error {}: {}", status, error_text.trim())).into());
        }

        Ok(delta_stream(response.bytes_stream().boxed()))
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

struct SseState {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<String>>,
    finished: bool,
}

/// Turn a raw SSE response body into content deltas
fn delta_stream(body: BoxStream<'static, reqwest::Result<Bytes>>) -> DeltaStream {
    let state = SseState {
        body,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            let events = match state.body.next().await {
                Some(Ok(bytes)) => state.decoder.push(&bytes),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(anyhow::Error::new(e).context("Stream interrupted")), state));
                }
                None => {
                    state.finished = true;
                    state.decoder.finish()
                }
            };

            for event in events {
                match event {
                    SseEvent::Delta(delta) => state.pending.push_back(Ok(delta)),
                    SseEvent::Error(message) => {
                        state.pending.push_back(Err(anyhow::anyhow!(message)));
                        state.finished = true;
                        break;
                    }
                    SseEvent::Done => {
                        debug!("Received end-of-stream marker");
                        state.finished = true;
                        break;
                    }
                }
            }
        }
    }))
}

/// One decoded server-sent event of interest
#[derive(Debug, Clone, PartialEq, Eq)]
enum SseEvent {
    Delta(String),
    Error(String),
    Done,
}

/// Line-buffered SSE decoder; network chunks may split lines anywhere
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line that had no newline
    fn finish(&mut self) -> Vec<SseEvent> {
        let line = std::mem::take(&mut self.buffer);
        parse_line(&String::from_utf8_lossy(&line))
            .into_iter()
            .collect()
    }
}

fn parse_line(line: &str) -> Option<SseEvent> {
    let data = line
        .trim_end_matches(['\r', '\n'])
        .strip_prefix(SSE_DATA_PREFIX)?
        .trim_start();

    if data == SSE_DONE_MARKER {
        return Some(SseEvent::Done);
    }

    // Unparseable payloads (keep-alives, unknown shapes) are skipped
    let chunk: StreamChunk = serde_json::from_str(data).ok()?;
    if let Some(error) = chunk.error {
        return Some(SseEvent::Error(error.message));
    }

    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty())
        .map(SseEvent::Delta)
}

// Streaming response structures (OpenAI format)

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: String,
}
