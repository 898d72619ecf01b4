use anyhow::Result;
use colored::Colorize;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    agents::{StreamOutcome, StreamingAgent},
    app::Config,
    cli::OutputFormat,
    context::{FileItem, TextItem},
    models::Model,
    session::Session,
    utils::log_info,
};

/// Result of a non-interactive run
#[derive(Debug, Serialize, Deserialize)]
pub struct NonInteractiveResult {
    /// The model's reply, or the error text if the backend failed
    pub response: String,
    /// How the generation ended
    pub outcome: StreamOutcome,
    /// Metadata about the execution
    pub metadata: ExecutionMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    /// Model used
    pub model: String,
    /// Number of context items sent
    pub items: usize,
    /// Execution time in milliseconds
    pub duration_ms: u128,
    /// Generation id within this run
    pub generation: u64,
}

/// Runs one generation over a context assembled from the command line
pub struct NonInteractiveRunner {
    agent: StreamingAgent,
    session: Session,
}

impl NonInteractiveRunner {
    pub fn new(model: Arc<dyn Model>, config: &Config) -> Self {
        Self {
            agent: StreamingAgent::from_config(model, config),
            session: Session::new(),
        }
    }

    /// Add a file to the context; a missing or non-regular path is an error
    pub fn add_file(&mut self, path: &Path) -> Result<()> {
        let item = FileItem::new(path)?;
        self.session.context_mut().add_item(item);
        Ok(())
    }

    pub fn add_text(&mut self, text: &str) {
        self.session.context_mut().add_item(TextItem::new(text));
    }

    /// Run the generation, writing chunks to `sink` as they arrive
    pub async fn execute<W: Write>(&mut self, sink: &mut W) -> Result<NonInteractiveResult> {
        let start_time = Instant::now();
        let items = self.session.context().len();

        let mut chunks = self.agent.run(&self.session);
        let generation = chunks.generation();
        while let Some(chunk) = chunks.next().await {
            sink.write_all(chunk.as_bytes())?;
            sink.flush()?;
        }
        drop(chunks);

        // The producer records its outcome before closing the stream
        let outcome = self.agent.last_outcome().unwrap_or(StreamOutcome::Cancelled);
        let duration_ms = start_time.elapsed().as_millis();
        log_info("⏱️", format!("Generation {} {} in {}ms", generation, outcome, duration_ms));

        Ok(NonInteractiveResult {
            response: self.session.reply(),
            outcome,
            metadata: ExecutionMetadata {
                model: self.agent.model_name().to_string(),
                items,
                duration_ms,
                generation,
            },
        })
    }

    /// Format the result for output
    pub fn format_result(&self, result: &NonInteractiveResult, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_else(|e| {
                format!("{{\"error\": \"Failed to serialize result: {}\"}}", e)
            }),
            OutputFormat::Text => match result.outcome {
                StreamOutcome::Completed => String::new(),
                StreamOutcome::Cancelled => format!("{}", "[cancelled]".yellow()),
                StreamOutcome::Failed => format!("{}", "[failed]".red()),
            },
        }
    }
}
