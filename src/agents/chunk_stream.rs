use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::types::{Delivery, StreamOutcome, Tracker};
use crate::session::{GenerationId, ReplySlot};

/// Consumer side of one generation: reply chunks in backend order.
///
/// The session's reply is built here, one chunk at a time as each is
/// yielded, so it always equals what this stream has handed out. Once the
/// generation is cancelled the stream ends immediately, even if chunks are
/// still buffered. Dropping the stream cancels the generation.
pub struct ChunkStream {
    generation: GenerationId,
    deliveries: ReceiverStream<Delivery>,
    cancel: CancellationToken,
    reply: Arc<ReplySlot>,
    tracker: Arc<Mutex<Tracker>>,
    done: bool,
}

impl ChunkStream {
    pub(crate) fn new(
        generation: GenerationId,
        receiver: mpsc::Receiver<Delivery>,
        cancel: CancellationToken,
        reply: Arc<ReplySlot>,
        tracker: Arc<Mutex<Tracker>>,
    ) -> Self {
        Self {
            generation,
            deliveries: ReceiverStream::new(receiver),
            cancel,
            reply,
            tracker,
            done: false,
        }
    }

    /// Id of the generation feeding this stream
    pub fn generation(&self) -> GenerationId {
        self.generation
    }

    fn finish(&mut self, outcome: StreamOutcome) {
        self.done = true;
        self.reply.release(self.generation);
        if self.tracker.lock().finish(self.generation, outcome) {
            info!(generation = self.generation, %outcome, "Generation finished");
        }
    }
}

impl Stream for ChunkStream {
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        let this = self.get_mut();
        if this.done || this.cancel.is_cancelled() {
            this.done = true;
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.deliveries).poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Delivery::Chunk(chunk))) => {
                if this.reply.append_as(this.generation, &chunk) {
                    Poll::Ready(Some(chunk))
                } else {
                    this.done = true;
                    Poll::Ready(None)
                }
            }
            Poll::Ready(Some(Delivery::Failed(message))) => {
                if !this.reply.set_as(this.generation, message.clone()) {
                    this.done = true;
                    return Poll::Ready(None);
                }
                this.finish(StreamOutcome::Failed);
                Poll::Ready(Some(message))
            }
            Poll::Ready(Some(Delivery::Finished)) => {
                this.finish(StreamOutcome::Completed);
                Poll::Ready(None)
            }
            // Producer went away without a terminal delivery
            Poll::Ready(None) => {
                this.finish(StreamOutcome::Cancelled);
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for ChunkStream {
    fn drop(&mut self) {
        self.cancel.cancel();
        if !self.done {
            self.finish(StreamOutcome::Cancelled);
        }
    }
}
