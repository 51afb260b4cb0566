//! Round-robin selection cursors.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

use crate::load_balancer::endpoint::ServiceName;

/// Round-robin selector.
/// Stores an internal counter to rotate through a list of `len` entries.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next index in `[0, len)` and advance the cursor.
    ///
    /// The stored value is kept normalized, so a cursor left beyond a list
    /// that has since shrunk wraps back into range. Concurrent callers each
    /// claim a distinct position.
    pub fn next_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let prev = self
            .counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c % len + 1) % len))
            .unwrap_or_else(|c| c);
        Some(prev % len)
    }

    /// Current position, normalized against `len`, without advancing.
    pub fn peek(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.counter.load(Ordering::Acquire) % len)
    }
}

/// One cursor per logical service, shared by all requests.
#[derive(Debug, Default)]
pub struct SelectionCursors {
    cursors: DashMap<ServiceName, RoundRobin>,
}

impl SelectionCursors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the start index for the next request to `service`.
    pub fn advance(&self, service: &ServiceName, len: usize) -> Option<usize> {
        if let Some(cursor) = self.cursors.get(service) {
            return cursor.next_index(len);
        }
        self.cursors
            .entry(service.clone())
            .or_default()
            .next_index(len)
    }

    pub fn peek(&self, service: &ServiceName, len: usize) -> Option<usize> {
        match self.cursors.get(service) {
            Some(cursor) => cursor.peek(len),
            None => (len > 0).then_some(0),
        }
    }
}
