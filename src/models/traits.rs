use anyhow::Result;
use async_trait::async_trait;

use super::types::{ChatRequest, DeltaStream};

/// Core trait that all model backends must implement
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Model: Send + Sync {
    /// Start a streaming completion and return its text deltas in order
    async fn stream_chat(&self, request: ChatRequest) -> Result<DeltaStream>;

    /// Get the name of the model
    fn name(&self) -> &str;
}
