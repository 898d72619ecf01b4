/// Session module - Gateway

mod reply;
mod state;

pub use reply::{GenerationId, ReplySlot};
pub use state::Session;
