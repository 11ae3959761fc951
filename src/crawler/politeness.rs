//! Per-host request spacing
//!
//! Every request to a host first reserves a start slot here. Slots for the same
//! host are at least the effective delay apart (configured delay, raised by a
//! robots.txt `Crawl-delay`), regardless of how many workers target the host.

use crate::state::HostState;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct Politeness {
    delay: Duration,
    hosts: Mutex<HashMap<String, HostState>>,
}

impl Politeness {
    /// Creates a tracker applying `delay` between requests to one host
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    /// Waits until this caller's slot for `host` arrives
    ///
    /// The reservation is made under the lock; the sleep happens outside it.
    pub async fn wait_turn(&self, host: &str) {
        if self.delay.is_zero() && !self.has_crawl_delay(host) {
            self.lock()
                .entry(host.to_string())
                .or_default()
                .request_count += 1;
            return;
        }

        let now = Instant::now();
        let start = {
            let mut hosts = self.lock();
            let state = hosts.entry(host.to_string()).or_default();
            state.reserve(self.delay, now.into_std())
        };

        let start = Instant::from_std(start);
        if start > now {
            tracing::trace!("Waiting {:?} for host {}", start - now, host);
            tokio::time::sleep_until(start).await;
        }
    }

    /// Records a robots.txt Crawl-delay for `host`
    pub fn set_crawl_delay(&self, host: &str, delay: Option<Duration>) {
        self.lock()
            .entry(host.to_string())
            .or_default()
            .crawl_delay = delay;
    }

    /// Requests made (or reserved) against `host` so far
    pub fn request_count(&self, host: &str) -> u32 {
        self.lock().get(host).map_or(0, |s| s.request_count)
    }

    /// The delay currently applied to `host`
    pub fn effective_delay(&self, host: &str) -> Duration {
        self.lock()
            .get(host)
            .map_or(self.delay, |s| s.effective_delay(self.delay))
    }

    fn has_crawl_delay(&self, host: &str) -> bool {
        self.lock()
            .get(host)
            .is_some_and(|s| s.crawl_delay.is_some_and(|d| !d.is_zero()))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, HostState>> {
        self.hosts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
