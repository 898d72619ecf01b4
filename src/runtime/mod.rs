/// Runtime orchestrator module - Gateway

mod input;
mod non_interactive;
mod orchestrator;

pub use input::{parse_line, render_items, ReplCommand};
pub use non_interactive::{ExecutionMetadata, NonInteractiveResult, NonInteractiveRunner};
pub use orchestrator::Orchestrator;
