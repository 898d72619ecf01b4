// Gateway module for agents - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod chunk_stream;
mod streaming;
mod types;

// Public re-exports - the ONLY way to access agent functionality
pub use chunk_stream::ChunkStream;
pub use streaming::StreamingAgent;
pub use types::{AgentState, StreamOutcome};
