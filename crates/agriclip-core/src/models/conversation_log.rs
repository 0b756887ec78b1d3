use std::sync::Arc;

use parking_lot::Mutex;

use super::message::Message;

/// The conversation log shared by the pollers and the controller.
pub type SharedLog = Arc<Mutex<ConversationLog>>;

/// Ordered, append-mostly log of conversation entries.
///
/// Several pollers with overlapping lifetimes write into the same log, so
/// every mutation is keyed by a stable message id and safe to apply
/// redundantly: append-with-unique-id, replace-by-id, remove-by-id. No
/// operation reorders existing entries, and consumers render in stored
/// order. Index-based edits are deliberately not offered.
#[derive(Debug, Default)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message unless its id is already present.
    ///
    /// Returns `true` when the message was inserted. The id guard makes the
    /// operation idempotent against repeated identical polls.
    pub fn append_unique(&mut self, message: Message) -> bool {
        if self.contains(&message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Replace the entry with `id` in place, keeping its position.
    ///
    /// Returns `false` (and drops `message`) when `id` is no longer present,
    /// e.g. because the conversation was cleared while a poller was still
    /// running. Terminal poller updates go through this guard so they can
    /// never append unconditionally.
    pub fn replace(&mut self, id: &str, message: Message) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(slot) => {
                *slot = message;
                true
            }
            None => false,
        }
    }

    /// Remove the entry with `id`. Returns `true` when something was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id);
        self.messages.len() != before
    }

    pub fn contains(&self, id: &str) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Entries in stored order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop everything and start over with a single greeting entry.
    pub fn reset(&mut self, greeting: Message) {
        self.messages.clear();
        self.messages.push(greeting);
    }
}
