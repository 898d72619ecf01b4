use parking_lot::Mutex;

/// Identifier of one streaming generation
pub type GenerationId = u64;

/// Reply text shared between a session and the generation writing into it.
///
/// Writes tagged with a generation id only land while that generation owns
/// the slot. Ownership is taken by `claim` and dropped by `release`, so a
/// superseded or cancelled generation's late writes are discarded.
#[derive(Debug, Default)]
pub struct ReplySlot {
    inner: Mutex<ReplyInner>,
}

#[derive(Debug, Default)]
struct ReplyInner {
    owner: Option<GenerationId>,
    text: String,
}

impl ReplySlot {
    pub fn text(&self) -> String {
        self.inner.lock().text.clone()
    }

    pub fn append(&self, chunk: &str) {
        self.inner.lock().text.push_str(chunk);
    }

    pub fn set(&self, text: String) {
        self.inner.lock().text = text;
    }

    pub fn clear(&self) {
        self.inner.lock().text.clear();
    }

    pub fn owner(&self) -> Option<GenerationId> {
        self.inner.lock().owner
    }

    /// Hand the slot to `generation` and reset the reply for it
    pub(crate) fn claim(&self, generation: GenerationId) {
        let mut inner = self.inner.lock();
        inner.owner = Some(generation);
        inner.text.clear();
    }

    /// Drop ownership if `generation` still holds it
    pub(crate) fn release(&self, generation: GenerationId) {
        let mut inner = self.inner.lock();
        if inner.owner == Some(generation) {
            inner.owner = None;
        }
    }

    /// Append on behalf of `generation`; returns false if it no longer owns the slot
    pub(crate) fn append_as(&self, generation: GenerationId, chunk: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.owner != Some(generation) {
            return false;
        }
        inner.text.push_str(chunk);
        true
    }

    /// Overwrite on behalf of `generation`; returns false if it no longer owns the slot
    pub(crate) fn set_as(&self, generation: GenerationId, text: String) -> bool {
        let mut inner = self.inner.lock();
        if inner.owner != Some(generation) {
            return false;
        }
        inner.text = text;
        true
    }
}
