//! The crawl frontier
//!
//! The frontier owns the FIFO queue of URLs waiting to be fetched and the
//! visit state of every URL the crawl has ever seen. A URL is enqueued at most
//! once per run; its state only moves forward.

use crate::state::VisitState;
use crate::url::UrlEntry;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Per-state URL counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierCounts {
    pub unvisited: usize,
    pub in_flight: usize,
    pub done: usize,
    pub failed: usize,
}

impl FrontierCounts {
    /// Total number of distinct URLs known
    pub fn total(&self) -> usize {
        self.unvisited + self.in_flight + self.done + self.failed
    }
}

#[derive(Debug, Default)]
struct Inner {
    queue: VecDeque<UrlEntry>,
    states: HashMap<String, VisitState>,
}

/// Thread-safe queue plus seen-set
///
/// All operations take a short internal lock and never await while holding it.
#[derive(Debug, Default)]
pub struct Frontier {
    inner: Mutex<Inner>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry unless its URL has been seen before
    ///
    /// Returns true if the entry was queued. The check and insert happen under
    /// one lock, so two workers discovering the same link cannot both win.
    pub fn enqueue(&self, entry: UrlEntry) -> bool {
        let mut inner = self.lock();
        if inner.states.contains_key(entry.key()) {
            return false;
        }
        inner
            .states
            .insert(entry.key().to_string(), VisitState::Unvisited);
        inner.queue.push_back(entry);
        true
    }

    /// Takes the oldest queued entry and marks it in flight
    pub fn dequeue(&self) -> Option<UrlEntry> {
        let mut inner = self.lock();
        let entry = inner.queue.pop_front()?;
        inner
            .states
            .insert(entry.key().to_string(), VisitState::InFlight);
        Some(entry)
    }

    /// Records that a URL was fetched and extracted
    pub fn mark_done(&self, key: &str) -> bool {
        self.transition(key, VisitState::Done)
    }

    /// Records that a URL failed, with the reason
    pub fn mark_failed(&self, key: &str, reason: &str) -> bool {
        self.transition(key, VisitState::Failed(reason.to_string()))
    }

    fn transition(&self, key: &str, next: VisitState) -> bool {
        let mut inner = self.lock();
        match inner.states.get_mut(key) {
            Some(current) if current.can_transition_to(&next) => {
                *current = next;
                true
            }
            Some(current) => {
                tracing::warn!("Ignoring transition of {} from {} to {}", key, current, next);
                false
            }
            None => {
                tracing::warn!("Ignoring transition of unknown URL {} to {}", key, next);
                false
            }
        }
    }

    /// Current state of a URL, if it has been seen
    pub fn state(&self, key: &str) -> Option<VisitState> {
        self.lock().states.get(key).cloned()
    }

    /// Whether a URL has been seen this run
    pub fn contains(&self, key: &str) -> bool {
        self.lock().states.contains_key(key)
    }

    /// True when nothing is waiting to be dequeued
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Number of entries waiting to be dequeued
    pub fn pending_len(&self) -> usize {
        self.lock().queue.len()
    }

    /// URLs currently marked in flight
    pub fn in_flight(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .lock()
            .states
            .iter()
            .filter(|(_, state)| **state == VisitState::InFlight)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Every known URL with its state, sorted by URL
    pub fn snapshot(&self) -> Vec<(String, VisitState)> {
        let mut entries: Vec<(String, VisitState)> = self
            .lock()
            .states
            .iter()
            .map(|(key, state)| (key.clone(), state.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Counts URLs per state
    pub fn counts(&self) -> FrontierCounts {
        let inner = self.lock();
        let mut counts = FrontierCounts::default();
        for state in inner.states.values() {
            match state {
                VisitState::Unvisited => counts.unvisited += 1,
                VisitState::InFlight => counts.in_flight += 1,
                VisitState::Done => counts.done += 1,
                VisitState::Failed(_) => counts.failed += 1,
            }
        }
        counts
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
