pub mod agents;
pub mod app;
pub mod cli;
pub mod constants;
pub mod context;
pub mod models;
pub mod runtime;
pub mod session;
pub mod utils;

pub use agents::{AgentState, ChunkStream, StreamOutcome, StreamingAgent};
pub use app::{load_config, Config};
pub use context::{Context, ContextItem, FileItem, TextItem};
pub use models::{Model, ModelFactory};
pub use session::Session;
pub use utils::MarkError;
