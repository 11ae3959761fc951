//! URL handling module for Harvest
//!
//! This module provides URL normalization, host extraction, offsite filtering
//! and the immutable [`UrlEntry`] the frontier hands out.

mod domain;
mod normalize;

use crate::{UrlError, UrlResult};
use chrono::{DateTime, Utc};
use url::Url;

// Re-export main functions
pub use domain::{domain_allowed, extract_domain, extract_host};
pub use normalize::{normalize_parsed, normalize_url};

/// A URL known to the crawl
///
/// The URL is fetched as it was discovered (minus the fragment); its
/// normalized form is the identity used for deduplication. Entries are never
/// mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlEntry {
    url: Url,
    key: String,
    depth: u32,
    discovered_at: DateTime<Utc>,
}

impl UrlEntry {
    /// Creates a depth-0 entry from a seed URL string
    pub fn seed(url: &str) -> UrlResult<Self> {
        Self::new(url, 0)
    }

    /// Creates an entry at the given depth from a URL string
    pub fn new(url: &str, depth: u32) -> UrlResult<Self> {
        let url = Url::parse(url.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
        Self::from_url(url, depth)
    }

    /// Creates an entry at the given depth from a parsed URL
    pub fn from_url(mut url: Url, depth: u32) -> UrlResult<Self> {
        let key = normalize_parsed(url.clone())?.into();
        url.set_fragment(None);
        Ok(Self {
            url,
            key,
            depth,
            discovered_at: Utc::now(),
        })
    }

    /// The URL to request, as discovered
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Identity of this entry (the normalized URL string)
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Link distance from the nearest seed
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// When this URL was first seen
    pub fn discovered_at(&self) -> DateTime<Utc> {
        self.discovered_at
    }

    /// Politeness key (host:port)
    pub fn host(&self) -> String {
        extract_host(&self.url).unwrap_or_default()
    }

    /// Host without port, for offsite filtering
    pub fn domain(&self) -> String {
        extract_domain(&self.url).unwrap_or_default()
    }
}

impl std::fmt::Display for UrlEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
