//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - The `Fetcher` seam the engine fetches through
//! - Building the shared HTTP client with user agent, pool, proxy and redirect policy
//! - Per-call timeouts
//! - Error classification into `FetchError`

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::ConfigError;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, Proxy};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A successfully received response
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Final URL after redirects; relative links resolve against it
    pub final_url: Url,

    /// HTTP status code
    pub status: u16,

    /// Content-Type header value, if present
    pub content_type: Option<String>,

    /// Raw body bytes
    pub body: Vec<u8>,
}

/// Reasons a fetch can fail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("HTTP {0}")]
    HttpError(u16),

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("network error: {0}")]
    Network(String),
}

impl FetchError {
    /// Returns true if a later attempt may succeed
    ///
    /// | Condition | Retryable |
    /// |-----------|-----------|
    /// | Timeout | yes |
    /// | Connection refused | yes |
    /// | HTTP 429, 5xx | yes |
    /// | Other HTTP status | no |
    /// | Redirect limit | no |
    /// | Other network error | no |
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionRefused => true,
            Self::HttpError(status) => *status == 429 || (500..600).contains(status),
            Self::TooManyRedirects | Self::Network(_) => false,
        }
    }

    /// Classifies a reqwest error
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_redirect() {
            Self::TooManyRedirects
        } else if error.is_connect() {
            Self::ConnectionRefused
        } else if let Some(status) = error.status() {
            Self::HttpError(status.as_u16())
        } else {
            Self::Network(error.to_string())
        }
    }
}

/// Something that can retrieve a URL
///
/// The engine only talks to this trait, so tests and embedders can substitute
/// their own transport. Implementations must be safe to call from many tasks
/// at once.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches a URL, returning the response or a classified failure
    ///
    /// Non-2xx statuses are failures (`FetchError::HttpError`).
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// The client owns a connection pool that is reused by every fetch of the
/// run; cloning the client shares the pool.
///
/// # Arguments
///
/// * `crawler` - Crawler settings (timeouts, redirects, pool size, proxy)
/// * `user_agent` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(ConfigError)` - Invalid proxy or TLS backend failure
pub fn build_http_client(
    crawler: &CrawlerConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, ConfigError> {
    let mut builder = Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(crawler.request_timeout_secs.min(10)))
        .redirect(Policy::limited(crawler.max_redirects))
        .pool_max_idle_per_host(crawler.concurrency)
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &crawler.proxy {
        let proxy = Proxy::all(proxy).map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
}

/// `Fetcher` backed by a pooled reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher from crawler and user agent settings
    pub fn new(crawler: &CrawlerConfig, user_agent: &UserAgentConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: build_http_client(crawler, user_agent)?,
            timeout: Duration::from_secs(crawler.request_timeout_secs),
        })
    }

    /// Returns a fetcher sharing the same pool but with a different per-call timeout
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            client: self.client.clone(),
            timeout,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpError(status.as_u16()));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;

        Ok(FetchResponse {
            final_url,
            status: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }
}
