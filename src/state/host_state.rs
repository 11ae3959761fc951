use std::time::{Duration, Instant};

/// Tracks the politeness state of a single host during crawling
///
/// Request slots are reserved rather than recorded after the fact, so several
/// concurrent tasks targeting the same host are spaced by the delay even when
/// they ask at the same instant.
#[derive(Debug, Clone, Default)]
pub struct HostState {
    /// Number of requests reserved for this host in the current crawl
    pub request_count: u32,

    /// Start time of the most recently reserved request
    pub last_request_time: Option<Instant>,

    /// Crawl-delay advertised by the host's robots.txt, if any
    pub crawl_delay: Option<Duration>,
}

impl HostState {
    /// Creates a new HostState with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// The delay actually applied: the larger of configured and robots delay
    pub fn effective_delay(&self, configured: Duration) -> Duration {
        match self.crawl_delay {
            Some(robots) => configured.max(robots),
            None => configured,
        }
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, configured: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let next = last + self.effective_delay(configured);
        if next > now {
            Some(next - now)
        } else {
            None
        }
    }

    /// Reserves the next request slot and returns when it starts
    ///
    /// The slot is `now` if the host is idle long enough, otherwise the
    /// earliest instant that respects the delay after the previous slot.
    pub fn reserve(&mut self, configured: Duration, now: Instant) -> Instant {
        let start = match self.time_until_next_request(configured, now) {
            Some(wait) => now + wait,
            None => now,
        };
        self.request_count += 1;
        self.last_request_time = Some(start);
        start
    }
}
