//! Harvest: a concurrent crawl-and-extract engine
//!
//! This crate fetches pages starting from a seed list, applies a static table of
//! selector rules to each document, streams the resulting records to a sink and
//! follows discovered links, with deduplication, bounded concurrency, per-host
//! politeness and failure isolation.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Harvest operations
///
/// Only configuration and sink failures are fatal for a run. Per-URL fetch and
/// extraction failures are recorded against the URL and never surface here.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sink error: {0}")]
    Sink(#[from] output::SinkError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector for rule '{rule}': {message}")]
    InvalidSelector { rule: String, message: String },

    #[error("No seed URLs were supplied")]
    NoSeeds,

    #[error("Concurrency must be between 1 and {max}, got {value}")]
    InvalidConcurrency { value: usize, max: usize },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Engine, Extractor, Frontier, HttpFetcher, StopHandle};
pub use output::{CrawlSummary, FieldValue, Record, Sink};
pub use state::{PageOutcome, VisitState};
pub use url::{extract_host, normalize_url, UrlEntry};
