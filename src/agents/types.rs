use serde::{Deserialize, Serialize};
use std::fmt;

use crate::session::GenerationId;

/// Whether a generation is currently in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Idle,
    Streaming,
}

/// How a generation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamOutcome {
    /// The backend stream ended normally
    Completed,
    /// Cancelled or superseded before the backend finished
    Cancelled,
    /// The backend call or its stream errored
    Failed,
}

impl fmt::Display for StreamOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// What the producer task hands to the consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// One backend delta
    Chunk(String),
    /// The backend failed; the text replaces the reply
    Failed(String),
    /// The backend stream ended normally
    Finished,
}

/// Lifecycle bookkeeping shared by the agent and the consumer
#[derive(Debug, Default)]
pub(crate) struct Tracker {
    pub(crate) active: Option<GenerationId>,
    pub(crate) last: Option<(GenerationId, StreamOutcome)>,
}

impl Tracker {
    /// Record a terminal state; only the active generation may finish
    pub(crate) fn finish(&mut self, id: GenerationId, outcome: StreamOutcome) -> bool {
        if self.active != Some(id) {
            return false;
        }
        self.active = None;
        self.last = Some((id, outcome));
        true
    }
}
