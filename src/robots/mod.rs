//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.
//! Robots checks are opt-in (`respect-robots`); when enabled, disallowed URLs are
//! never fetched and a `Crawl-delay` raises the host's politeness delay.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache};
pub use parser::{ParsedRobots, MAX_CRAWL_DELAY};

use crate::crawler::Fetcher;
use std::time::Duration;
use url::Url;

/// The robots.txt decision for one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotsVerdict {
    /// Whether the URL may be fetched
    pub allowed: bool,

    /// Crawl-delay advertised for our agent
    pub crawl_delay: Option<Duration>,
}

/// Fetches robots.txt for the host of `url`
///
/// Any failure (unreachable host, HTTP error, undecodable body) is treated as
/// "no restrictions".
pub async fn fetch_robots(fetcher: &dyn Fetcher, url: &Url) -> ParsedRobots {
    let robots_url = match url.join("/robots.txt") {
        Ok(u) => u,
        Err(_) => return ParsedRobots::allow_all(),
    };

    match fetcher.fetch(&robots_url).await {
        Ok(response) => match String::from_utf8(response.body) {
            Ok(content) => ParsedRobots::from_content(&content),
            Err(_) => {
                tracing::debug!("robots.txt at {} is not UTF-8, allowing all", robots_url);
                ParsedRobots::allow_all()
            }
        },
        Err(e) => {
            tracing::debug!("No robots.txt at {} ({}), allowing all", robots_url, e);
            ParsedRobots::allow_all()
        }
    }
}

/// Checks URLs against cached robots.txt files
#[derive(Debug)]
pub struct RobotsPolicy {
    user_agent: String,
    cache: RobotsCache,
}

impl RobotsPolicy {
    /// Creates a policy for the given product token (e.g. the crawler name)
    pub fn new(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            cache: RobotsCache::new(),
        }
    }

    /// Decides whether `url` may be fetched, loading robots.txt on first use
    pub async fn check(&self, fetcher: &dyn Fetcher, host: &str, url: &Url) -> RobotsVerdict {
        let robots = self
            .cache
            .get_or_load(host, || fetch_robots(fetcher, url))
            .await;

        RobotsVerdict {
            allowed: robots.is_allowed(url.as_str(), &self.user_agent),
            crawl_delay: robots.crawl_delay(&self.user_agent),
        }
    }
}
