//! Configuration module for Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! standalone rule files and seed lists.
//!
//! # Example
//!
//! ```no_run
//! use harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawler will run {} fetches at once", config.crawler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, Multiplicity, OutputConfig, OutputFormat, RuleConfig, RuleSetConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_rules_hash, load_config, load_rules, load_seeds};
pub use validation::{
    validate, validate_concurrency, validate_crawler_config, validate_rules, validate_seeds,
    MAX_CONCURRENCY,
};
