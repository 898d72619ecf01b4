use crate::constants::CONTEXT_SEPARATOR;

use super::item::ContextItem;

/// Ordered collection of context items forming the prompt
#[derive(Debug, Clone, Default)]
pub struct Context {
    items: Vec<ContextItem>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item; order is prompt order
    pub fn add_item(&mut self, item: impl Into<ContextItem>) {
        self.items.push(item.into());
    }

    /// Remove the item at `index`, shifting later items down. Out of range is a no-op.
    pub fn delete_item(&mut self, index: usize) {
        if index < self.items.len() {
            self.items.remove(index);
        }
    }

    /// Snapshot of the items for display
    pub fn items(&self) -> Vec<ContextItem> {
        self.items.clone()
    }

    pub fn get(&self, index: usize) -> Option<&ContextItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Combined prompt text of every item
    pub fn message(&self) -> String {
        self.items
            .iter()
            .map(ContextItem::message)
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }
}
