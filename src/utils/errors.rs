use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Mark
#[derive(Error, Debug)]
pub enum MarkError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Path is not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
