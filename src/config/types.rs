use serde::{Deserialize, Serialize};

/// Main configuration structure for Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub seeds: Vec<String>,
    #[serde(flatten)]
    pub rules: RuleSetConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of fetches in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Minimum time between requests to the same host (milliseconds)
    #[serde(default, rename = "politeness-delay")]
    pub politeness_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout", rename = "request-timeout")]
    pub request_timeout_secs: u64,

    /// Retries after the first failed attempt, for retryable failures only
    #[serde(default, rename = "max-retries")]
    pub max_retries: u32,

    /// Base delay for exponential retry backoff (milliseconds)
    #[serde(default = "default_retry_delay", rename = "retry-delay")]
    pub retry_delay_ms: u64,

    /// Maximum redirect hops followed per request
    #[serde(default = "default_max_redirects", rename = "max-redirects")]
    pub max_redirects: usize,

    /// Links deeper than this are not followed (seeds are depth 0)
    #[serde(default, rename = "max-depth")]
    pub max_depth: Option<u32>,

    /// Hosts links may point to; empty means any host
    #[serde(default, rename = "allowed-domains")]
    pub allowed_domains: Vec<String>,

    /// Whether link rules feed the frontier at all
    #[serde(default = "default_true", rename = "follow-links")]
    pub follow_links: bool,

    /// Whether to consult robots.txt before fetching
    #[serde(default, rename = "respect-robots")]
    pub respect_robots: bool,

    /// How long in-flight fetches may run after a stop request (seconds)
    #[serde(default = "default_grace_period", rename = "grace-period")]
    pub grace_period_secs: u64,

    /// Number of records buffered between the engine and the sink
    #[serde(default = "default_channel_capacity", rename = "sink-buffer")]
    pub sink_buffer: usize,

    /// Explicit proxy URL; when unset the HTTP_PROXY/HTTPS_PROXY environment applies
    #[serde(default)]
    pub proxy: Option<String>,
}

fn default_concurrency() -> usize {
    8
}

fn default_timeout() -> u64 {
    30
}

fn default_retry_delay() -> u64 {
    500
}

fn default_max_redirects() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_grace_period() -> u64 {
    10
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            politeness_delay_ms: 0,
            request_timeout_secs: default_timeout(),
            max_retries: 0,
            retry_delay_ms: default_retry_delay(),
            max_redirects: default_max_redirects(),
            max_depth: None,
            allowed_domains: Vec::new(),
            follow_links: true,
            respect_robots: false,
            grace_period_secs: default_grace_period(),
            sink_buffer: default_channel_capacity(),
            proxy: None,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(default, rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "harvest".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Destination file; records go to stdout when unset
    #[serde(default)]
    pub path: Option<String>,

    /// Serialization format of the destination
    #[serde(default)]
    pub format: OutputFormat,
}

/// Supported record destinations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Newline-delimited JSON objects
    #[default]
    Jsonl,
    /// SQLite database with one row per record
    Sqlite,
}

/// The declarative extraction rules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSetConfig {
    /// Selector for repeated item blocks; each match becomes one record
    #[serde(default)]
    pub item: Option<String>,

    /// Field and link rules, in output order
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleConfig>,
}

/// A single field or link rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Output field name
    pub name: String,

    /// CSS selector with an optional `::text` or `::attr(name)` suffix
    pub selector: String,

    /// Whether to keep the first match or all matches
    #[serde(default)]
    pub multiplicity: Multiplicity,

    /// Link rules produce follow-up URLs instead of record fields
    #[serde(default, rename = "is-link")]
    pub is_link: bool,
}

impl RuleConfig {
    /// Creates a field rule
    pub fn field(name: &str, selector: &str, multiplicity: Multiplicity) -> Self {
        Self {
            name: name.to_string(),
            selector: selector.to_string(),
            multiplicity,
            is_link: false,
        }
    }

    /// Creates a link rule collecting every match
    pub fn link(name: &str, selector: &str) -> Self {
        Self {
            name: name.to_string(),
            selector: selector.to_string(),
            multiplicity: Multiplicity::All,
            is_link: true,
        }
    }
}

/// How many matches a rule keeps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Multiplicity {
    /// First match only; null when absent
    #[default]
    Single,
    /// Every match in document order; empty when absent
    All,
}
