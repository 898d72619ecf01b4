use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::app::Config;

#[derive(Parser, Debug)]
#[command(name = "mark")]
#[command(version)]
#[command(about = "A terminal chat assistant that streams replies over your context", long_about = None)]
pub struct Cli {
    /// Model name sent to the backend (e.g., gpt-4o-mini)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long)]
    pub base_url: Option<String>,

    /// Maximum tokens to generate per reply
    #[arg(long)]
    pub max_tokens: Option<usize>,

    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Use the offline demo model instead of a real backend
    #[arg(long)]
    pub demo: bool,

    /// Non-interactive: add this text to the context and print one reply
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Non-interactive: add a file to the context (repeatable)
    #[arg(short = 'f', long = "file")]
    pub files: Vec<PathBuf>,

    /// Output format for non-interactive mode
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Whether a one-shot run was requested instead of the REPL
    pub fn is_non_interactive(&self) -> bool {
        self.prompt.is_some() || !self.files.is_empty()
    }

    /// Apply command-line overrides on top of loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model.name = model.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.model.base_url = base_url.clone();
        }
        if let Some(max_tokens) = self.max_tokens {
            config.model.max_tokens = max_tokens;
        }
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Write a default configuration file
    Init,
    /// Start a chat session (default)
    Chat,
    /// Show version information
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Stream the reply as plain text
    Text,
    /// Print a JSON summary after the reply completes
    Json,
}
