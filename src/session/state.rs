use std::sync::Arc;

use crate::context::Context;

use super::reply::ReplySlot;

/// One conversation: a context plus the pending or last reply
#[derive(Debug, Default)]
pub struct Session {
    context: Context,
    reply: Arc<ReplySlot>,
}

impl Session {
    /// Create a session with an empty context and reply
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Current reply text
    pub fn reply(&self) -> String {
        self.reply.text()
    }

    /// Append a streamed chunk to the reply
    pub fn append_chunk(&self, chunk: &str) {
        self.reply.append(chunk);
    }

    /// Replace the reply wholesale
    pub fn set_reply(&self, message: impl Into<String>) {
        self.reply.set(message.into());
    }

    pub fn clear_reply(&self) {
        self.reply.clear();
    }

    /// Shared handle a generation writes through
    pub(crate) fn reply_slot(&self) -> Arc<ReplySlot> {
        Arc::clone(&self.reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TextItem;

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new();
        assert!(session.context().is_empty());
        assert_eq!(session.reply(), "");
    }

    #[test]
    fn test_reply_append_set_clear() {
        let session = Session::new();
        session.append_chunk("Hello");
        session.append_chunk(", world");
        assert_eq!(session.reply(), "Hello, world");

        session.set_reply("Replaced");
        assert_eq!(session.reply(), "Replaced");

        session.clear_reply();
        assert_eq!(session.reply(), "");
    }

    #[test]
    fn test_context_is_owned_by_session() {
        let mut session = Session::new();
        session.context_mut().add_item(TextItem::new("note"));
        assert_eq!(session.context().message(), "note");

        let fresh = Session::new();
        assert!(fresh.context().is_empty());
    }
}
