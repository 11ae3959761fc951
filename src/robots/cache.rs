//! Robots.txt caching implementation
//!
//! Each host's robots.txt is fetched at most once per 24 hours, even when many
//! tasks ask for it at the same moment.

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Cached robots.txt data for a host
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Creates a new CachedRobots instance stamped with the current time
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the cached robots.txt is older than 24 hours
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.fetched_at > Duration::hours(24)
    }
}

type Slot = Arc<OnceCell<CachedRobots>>;

/// Per-host robots.txt cache
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: Mutex<HashMap<String, Slot>>,
}

impl RobotsCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached robots for `host`, running `load` if absent or stale
    ///
    /// Concurrent callers for the same host share a single `load`.
    pub async fn get_or_load<F, Fut>(&self, host: &str, load: F) -> ParsedRobots
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ParsedRobots>,
    {
        let slot = self.slot(host);
        let cached = slot
            .get_or_init(move || async move { CachedRobots::new(load().await) })
            .await;
        cached.content.clone()
    }

    /// Number of hosts with an entry
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, host: &str) -> Slot {
        let mut entries = self.lock();
        let stale = entries
            .get(host)
            .and_then(|slot| slot.get())
            .is_some_and(CachedRobots::is_stale);
        if stale {
            entries.remove(host);
        }
        entries
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
