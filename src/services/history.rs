//! History Manager
//!
//! Most-recent-first log of completed query/response pairs.

use std::collections::VecDeque;

use crate::models::chat::Message;
use crate::models::history::HistoryEntry;

/// Append-only history of completed turns.
#[derive(Debug, Clone, Default)]
pub struct HistoryManager {
    entries: VecDeque<HistoryEntry>,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed turn. Entries are neither deduplicated nor capped.
    pub fn add_entry(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
    }

    /// Entries, most recent first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Replay an entry as a standalone two-message exchange.
    pub fn view_entry(&self, id: &str) -> Option<Vec<Message>> {
        self.get(id).map(Self::exchange)
    }

    /// The user/assistant pair for an entry.
    pub fn exchange(entry: &HistoryEntry) -> Vec<Message> {
        let mut user = Message::user(entry.query.clone());
        user.timestamp = entry.timestamp;
        let mut assistant = Message::assistant(entry.response.clone(), entry.citations.clone());
        assistant.timestamp = entry.timestamp;
        vec![user, assistant]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
