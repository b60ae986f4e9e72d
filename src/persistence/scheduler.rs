//! Debounced save scheduling.

use std::time::{Duration, Instant};

/// Tracks unsaved mutations and decides when a debounced save is due.
#[derive(Debug, Clone)]
pub struct SaveScheduler {
    debounce: Duration,
    /// Time of the most recent unsaved mutation
    last_mutation: Option<Instant>,
}

impl SaveScheduler {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            debounce: Duration::from_millis(debounce_ms),
            last_mutation: None,
        }
    }

    pub fn set_debounce_ms(&mut self, debounce_ms: u64) {
        self.debounce = Duration::from_millis(debounce_ms);
    }

    /// Record a mutation at `now`; pushes the pending save back.
    pub fn mark_dirty(&mut self, now: Instant) {
        self.last_mutation = Some(now);
    }

    pub fn is_dirty(&self) -> bool {
        self.last_mutation.is_some()
    }

    /// True once the debounce window has passed since the last mutation.
    pub fn is_due(&self, now: Instant) -> bool {
        self.last_mutation
            .is_some_and(|at| now.saturating_duration_since(at) >= self.debounce)
    }

    /// Consume the pending save if it is due.
    pub fn take_due(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.last_mutation = None;
            true
        } else {
            false
        }
    }

    /// Forget any pending save (after an explicit save or a reload).
    pub fn clear(&mut self) {
        self.last_mutation = None;
    }
}
