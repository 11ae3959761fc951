//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `Fetcher` trait
//! - Rule-driven record and link extraction
//! - The deduplicating frontier
//! - Per-host politeness and retry with backoff
//! - Overall crawl coordination in the `Engine`

mod engine;
mod extractor;
mod fetcher;
mod frontier;
mod politeness;
mod retry;

pub use engine::{Engine, EngineSettings, StopHandle, ABORTED, DISALLOWED};
pub use extractor::{resolve_link, ExtractError, Extraction, Extractor};
pub use fetcher::{build_http_client, FetchError, FetchResponse, Fetcher, HttpFetcher};
pub use frontier::{Frontier, FrontierCounts};
pub use politeness::Politeness;
pub use retry::{with_retry, Attempted, RetryPolicy};
