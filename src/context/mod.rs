// Gateway module for context - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod item;
mod list;

// Public re-exports - the ONLY way to access context functionality
pub use item::{ContextItem, FileItem, TextItem};
pub use list::Context;
