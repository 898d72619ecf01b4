use anyhow::Error;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::chunk_stream::ChunkStream;
use super::types::{AgentState, Delivery, StreamOutcome, Tracker};
use crate::app::Config;
use crate::constants::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_TOKENS, ERROR_CHUNK_PREFIX};
use crate::models::{ChatMessage, ChatRequest, Model};
use crate::session::{GenerationId, ReplySlot, Session};

/// Streams model replies for a session, one generation at a time.
///
/// `run` cancels any generation still in flight before starting the next,
/// so at most one generation ever writes a session's reply. The reply grows
/// as the returned [`ChunkStream`] yields chunks, so it always matches what
/// the caller has seen. Cancellation is cooperative: it is observed while
/// waiting on the backend or on the consumer, never halfway through a chunk.
pub struct StreamingAgent {
    model: Arc<dyn Model>,
    max_tokens: usize,
    channel_capacity: usize,
    next_generation: GenerationId,
    active: Option<ActiveGeneration>,
    tracker: Arc<Mutex<Tracker>>,
}

struct ActiveGeneration {
    id: GenerationId,
    cancel: CancellationToken,
    reply: Arc<ReplySlot>,
    task: JoinHandle<()>,
}

impl StreamingAgent {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self {
            model,
            max_tokens: DEFAULT_MAX_TOKENS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            next_generation: 1,
            active: None,
            tracker: Arc::new(Mutex::new(Tracker::default())),
        }
    }

    /// Build an agent using the configured token ceiling and channel size
    pub fn from_config(model: Arc<dyn Model>, config: &Config) -> Self {
        Self::new(model)
            .with_max_tokens(config.model.max_tokens)
            .with_channel_capacity(config.agent.channel_capacity)
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Start a generation for `session`, cancelling any generation in flight.
    ///
    /// The prompt is one user message holding the session's combined
    /// context, sent even when that context is empty. The session's reply is
    /// reset and then owned by the new generation until its stream ends.
    pub fn run(&mut self, session: &Session) -> ChunkStream {
        self.cancel();

        let id = self.next_generation;
        self.next_generation += 1;

        let request = ChatRequest {
            messages: vec![ChatMessage::user(session.context().message())],
            max_tokens: self.max_tokens,
        };

        let reply = session.reply_slot();
        reply.claim(id);
        self.tracker.lock().active = Some(id);

        let cancel = CancellationToken::new();
        let (sender, receiver) = mpsc::channel(self.channel_capacity);

        let generation = Generation {
            id,
            model: Arc::clone(&self.model),
            cancel: cancel.clone(),
            sender,
        };

        info!(
            generation = id,
            items = session.context().len(),
            "Starting generation"
        );
        let task = tokio::spawn(generation.drive(request));

        self.active = Some(ActiveGeneration {
            id,
            cancel: cancel.clone(),
            reply: Arc::clone(&reply),
            task,
        });

        ChunkStream::new(id, receiver, cancel, reply, Arc::clone(&self.tracker))
    }

    /// Cancel the generation in flight, if any. Safe to call at any time.
    ///
    /// The generation stops writing to the reply immediately; the chunks
    /// already yielded stay in the session, anything still buffered is lost.
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            self.revoke(&active);
        }
    }

    /// Cancel and wait for the producer task to wind down
    pub async fn cancel_and_wait(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        self.revoke(&active);

        if let Err(e) = active.task.await {
            warn!(generation = active.id, error = %e, "Generation task ended abnormally");
        }
    }

    fn revoke(&self, active: &ActiveGeneration) {
        active.cancel.cancel();
        active.reply.release(active.id);
        if self.tracker.lock().finish(active.id, StreamOutcome::Cancelled) {
            debug!(generation = active.id, "Generation cancelled");
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.state() == AgentState::Streaming
    }

    pub fn state(&self) -> AgentState {
        if self.tracker.lock().active.is_some() {
            AgentState::Streaming
        } else {
            AgentState::Idle
        }
    }

    /// Terminal state of the most recently finished generation
    pub fn last_outcome(&self) -> Option<StreamOutcome> {
        self.tracker.lock().last.map(|(_, outcome)| outcome)
    }

    /// Id of the current or most recent generation
    pub fn generation(&self) -> Option<GenerationId> {
        (self.next_generation > 1).then(|| self.next_generation - 1)
    }
}

impl Drop for StreamingAgent {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Producer side of one generation
struct Generation {
    id: GenerationId,
    model: Arc<dyn Model>,
    cancel: CancellationToken,
    sender: mpsc::Sender<Delivery>,
}

impl Generation {
    async fn drive(self, request: ChatRequest) {
        let started = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return,
            started = self.model.stream_chat(request) => started,
        };

        let mut deltas = match started {
            Ok(deltas) => deltas,
            Err(e) => return self.fail(e).await,
        };

        let mut chunks = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                next = deltas.next() => next,
            };

            match next {
                Some(Ok(delta)) => {
                    if !self.deliver(Delivery::Chunk(delta)).await {
                        return;
                    }
                    chunks += 1;
                }
                Some(Err(e)) => return self.fail(e).await,
                None => {
                    debug!(generation = self.id, chunks, "Backend stream ended");
                    self.deliver(Delivery::Finished).await;
                    return;
                }
            }
        }
    }

    /// Surface a backend error as the final chunk and the reply
    async fn fail(&self, error: Error) {
        let detail = format!("{:#}", error);
        warn!(generation = self.id, error = %detail, "Backend failure");

        let message = format!("{}{}", ERROR_CHUNK_PREFIX, detail);
        self.deliver(Delivery::Failed(message)).await;
    }

    /// Hand a delivery to the consumer; false once cancelled or the consumer is gone
    async fn deliver(&self, delivery: Delivery) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.sender.send(delivery) => sent.is_ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TextItem;
    use crate::models::{DeltaStream, MockModel};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use futures::stream;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    /// Replays a fixed script of deltas, pausing before each one
    struct ScriptedModel {
        script: Vec<Result<String, String>>,
        delay: Duration,
    }

    impl ScriptedModel {
        fn chunks(chunks: &[&str], delay: Duration) -> Arc<dyn Model> {
            Arc::new(Self {
                script: chunks.iter().map(|c| Ok(c.to_string())).collect(),
                delay,
            })
        }

        fn failing_after(chunks: &[&str], error: &str) -> Arc<dyn Model> {
            let mut script: Vec<Result<String, String>> =
                chunks.iter().map(|c| Ok(c.to_string())).collect();
            script.push(Err(error.to_string()));
            Arc::new(Self {
                script,
                delay: Duration::ZERO,
            })
        }
    }

    #[async_trait]
    impl Model for ScriptedModel {
        async fn stream_chat(&self, _request: ChatRequest) -> Result<DeltaStream> {
            let delay = self.delay;
            let deltas = stream::iter(self.script.clone()).then(move |step| async move {
                tokio::time::sleep(delay).await;
                step.map_err(|e| anyhow!(e))
            });
            Ok(Box::pin(deltas))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    const REPLY: [&str; 4] = ["The ", "quick ", "brown ", "fox"];

    #[tokio::test]
    async fn test_completed_reply_matches_chunks() {
        let mut agent = StreamingAgent::new(ScriptedModel::chunks(&REPLY, Duration::ZERO));
        let session = Session::new();

        let chunks: Vec<String> = agent.run(&session).collect().await;

        assert_eq!(chunks, REPLY.map(String::from).to_vec());
        assert_eq!(session.reply(), "The quick brown fox");
        assert_eq!(chunks.concat(), session.reply());
        assert!(!agent.is_streaming());
        assert_eq!(agent.last_outcome(), Some(StreamOutcome::Completed));
        assert_eq!(agent.generation(), Some(1));
    }

    #[tokio::test]
    async fn test_prompt_is_single_user_message() {
        let mut model = MockModel::new();
        model
            .expect_stream_chat()
            .withf(|request| {
                request.messages == vec![ChatMessage::user("A\n\n---\n\nB")]
                    && request.max_tokens == 1000
            })
            .times(1)
            .returning(|_| Ok(Box::pin(stream::iter(vec![Ok::<_, anyhow::Error>("ok".to_string())]))));

        let mut agent = StreamingAgent::new(Arc::new(model));
        let mut session = Session::new();
        session.context_mut().add_item(TextItem::new("A"));
        session.context_mut().add_item(TextItem::new(" B "));

        let reply: String = agent.run(&session).collect().await;
        assert_eq!(reply, "ok");
    }

    #[tokio::test]
    async fn test_empty_context_still_reaches_backend() {
        let mut model = MockModel::new();
        model
            .expect_stream_chat()
            .withf(|request| {
                request.messages == vec![ChatMessage::user("")] && request.max_tokens == 42
            })
            .times(1)
            .returning(|_| Ok(Box::pin(stream::empty::<Result<String>>())));

        let mut agent = StreamingAgent::new(Arc::new(model)).with_max_tokens(42);
        let session = Session::new();

        let chunks: Vec<String> = agent.run(&session).collect().await;
        assert!(chunks.is_empty());
        assert_eq!(session.reply(), "");
        assert_eq!(agent.last_outcome(), Some(StreamOutcome::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_stream_and_keeps_partial_reply() {
        let mut agent =
            StreamingAgent::new(ScriptedModel::chunks(&REPLY, Duration::from_millis(10)));
        let session = Session::new();

        let mut chunks = agent.run(&session);
        assert!(agent.is_streaming());

        let mut received = String::new();
        for _ in 0..2 {
            received.push_str(&chunks.next().await.unwrap());
        }

        agent.cancel();
        assert!(!agent.is_streaming());
        assert_eq!(chunks.next().await, None);

        // Let the producer observe cancellation; the reply must not move
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(session.reply(), received);
        assert_eq!(agent.last_outcome(), Some(StreamOutcome::Cancelled));

        agent.cancel();
        assert_eq!(agent.last_outcome(), Some(StreamOutcome::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_drops_buffered_chunks_from_reply() {
        let burst: Vec<String> = (0..10).map(|i| format!("c{} ", i)).collect();
        let burst: Vec<&str> = burst.iter().map(String::as_str).collect();
        let mut agent = StreamingAgent::new(ScriptedModel::chunks(&burst, Duration::ZERO));
        let session = Session::new();

        let mut chunks = agent.run(&session);
        let mut delivered = chunks.next().await.unwrap();

        // Give the producer time to fill the channel and finish
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        agent.cancel();
        while let Some(chunk) = chunks.next().await {
            delivered.push_str(&chunk);
        }

        assert_eq!(delivered, "c0 ");
        assert_eq!(session.reply(), delivered);
        assert_eq!(agent.last_outcome(), Some(StreamOutcome::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_when_idle_is_noop() {
        let mut agent = StreamingAgent::new(ScriptedModel::chunks(&REPLY, Duration::ZERO));
        agent.cancel();
        agent.cancel_and_wait().await;
        assert_eq!(agent.state(), AgentState::Idle);
        assert_eq!(agent.last_outcome(), None);
        assert_eq!(agent.generation(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_run_supersedes_first() {
        let mut agent =
            StreamingAgent::new(ScriptedModel::chunks(&REPLY, Duration::from_millis(10)));
        let session = Session::new();

        let mut first = agent.run(&session);
        assert_eq!(first.next().await.as_deref(), Some("The "));

        let second = agent.run(&session);
        assert_eq!(first.next().await, None);
        assert_eq!(second.generation(), 2);

        let chunks: Vec<String> = second.collect().await;
        assert_eq!(chunks.concat(), "The quick brown fox");
        assert_eq!(session.reply(), "The quick brown fox");

        // The superseded producer must not write after the fact
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(session.reply(), "The quick brown fox");
        assert_eq!(agent.last_outcome(), Some(StreamOutcome::Completed));
    }

    #[tokio::test]
    async fn test_backend_error_mid_stream() {
        let mut agent =
            StreamingAgent::new(ScriptedModel::failing_after(&["partial "], "connection reset"));
        let session = Session::new();

        let chunks: Vec<String> = agent.run(&session).collect().await;

        let last = chunks.last().unwrap();
        assert_eq!(last, "Error: connection reset");
        assert_eq!(session.reply(), *last);
        assert_eq!(chunks.first().map(String::as_str), Some("partial "));
        assert_eq!(agent.last_outcome(), Some(StreamOutcome::Failed));
        assert!(!agent.is_streaming());
    }

    #[tokio::test]
    async fn test_backend_error_before_stream() {
        let mut model = MockModel::new();
        model
            .expect_stream_chat()
            .returning(|_| Err(anyhow!("connection refused").context("request failed")));

        let mut agent = StreamingAgent::new(Arc::new(model));
        let session = Session::new();

        let chunks: Vec<String> = agent.run(&session).collect().await;

        assert_eq!(chunks, vec!["Error: request failed: connection refused".to_string()]);
        assert_eq!(session.reply(), chunks[0]);
        assert_eq!(agent.last_outcome(), Some(StreamOutcome::Failed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_session_isolated_from_cancelled_generation() {
        let mut agent =
            StreamingAgent::new(ScriptedModel::chunks(&REPLY, Duration::from_millis(10)));
        let mut session = Session::new();

        let mut chunks = agent.run(&session);
        chunks.next().await;

        agent.cancel_and_wait().await;
        session = Session::new();
        assert_eq!(session.reply(), "");
        assert_eq!(chunks.next().await, None);

        let reply: String = agent.run(&session).collect().await;
        assert_eq!(reply, session.reply());
        assert_eq!(agent.generation(), Some(2));
    }

    #[tokio::test]
    async fn test_dropping_stream_cancels_generation() {
        let mut agent =
            StreamingAgent::new(ScriptedModel::chunks(&REPLY, Duration::from_millis(10)));
        let session = Session::new();

        drop(agent.run(&session));
        agent.cancel_and_wait().await;

        assert!(!agent.is_streaming());
        assert_eq!(agent.last_outcome(), Some(StreamOutcome::Cancelled));
    }
}
