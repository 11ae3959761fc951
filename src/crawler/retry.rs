//! Retry with exponential backoff for fetches
//!
//! Only failures that `FetchError::is_retryable` accepts are retried; a 404 or
//! a redirect loop fails on the first attempt.

use crate::config::CrawlerConfig;
use crate::crawler::FetchError;
use std::future::Future;
use std::time::Duration;

/// Backoff settings for one URL's attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,

    /// Delay before the first retry; doubles each retry
    pub base_delay: Duration,

    /// Cap on the delay between attempts
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_delay_ms),
            ..Self::none()
        }
    }

    /// Delay before attempt number `attempt` (0 is the first attempt)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 1);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Result of a retried operation
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, FetchError>,

    /// Number of retries performed (attempts minus one)
    pub retries: u32,
}

/// Runs `operation` until it succeeds, fails permanently, or retries run out
///
/// The closure receives the attempt number, starting at 0.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Attempted<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying after delay");
            tokio::time::sleep(delay).await;
        }

        match operation(attempt).await {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    retries: attempt,
                }
            }
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                tracing::debug!(attempt, max_retries = policy.max_retries, error = %e, "Attempt failed");
                attempt += 1;
            }
            Err(e) => {
                return Attempted {
                    result: Err(e),
                    retries: attempt,
                }
            }
        }
    }
}
