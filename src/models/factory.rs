use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use super::demo::DemoModel;
use super::openai::OpenAiModel;
use super::traits::Model;
use crate::app::Config;

/// Factory for creating model instances
pub struct ModelFactory;

impl ModelFactory {
    /// Create the backend described by `config`, or the offline demo model
    pub fn create(config: &Config, demo: bool) -> Result<Arc<dyn Model>> {
        if demo {
            let pacing = Duration::from_millis(config.demo.pacing_ms);
            return Ok(Arc::new(DemoModel::new(pacing)));
        }

        let model = OpenAiModel::new(&config.model)?;
        Ok(Arc::new(model))
    }
}
