//! Debounced autosave deadlines per document.
//!
//! The scheduler only tracks deadlines. Time is passed in by the caller, so
//! the owner decides when to poll and what to do with fired entries.

use crate::document::DocumentId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct AutosaveScheduler {
    deadlines: HashMap<DocumentId, Instant>,
}

impl AutosaveScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a save of `id` after `delay`, replacing any earlier deadline.
    pub fn schedule(&mut self, id: DocumentId, now: Instant, delay: Duration) {
        self.deadlines.insert(id, now + delay);
    }

    /// Drop the pending save of `id`. Returns whether one was pending.
    pub fn cancel(&mut self, id: DocumentId) -> bool {
        self.deadlines.remove(&id).is_some()
    }

    pub fn is_scheduled(&self, id: DocumentId) -> bool {
        self.deadlines.contains_key(&id)
    }

    /// Remove and return every entry whose deadline is at or before `now`,
    /// earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<DocumentId> {
        let mut due: Vec<(Instant, DocumentId)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, deadline)| (*deadline, *id))
            .collect();
        due.sort();

        for (_, id) in &due {
            self.deadlines.remove(id);
        }
        due.into_iter().map(|(_, id)| id).collect()
    }

    /// Earliest pending deadline, used to size the host loop's wait.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}
