//! Crawl engine - main crawl orchestration logic
//!
//! The engine owns the frontier and drives the crawl:
//! - Seeds the frontier and validates the run before any fetch
//! - Launches one task per URL, bounded by a semaphore
//! - Streams records to the sink task over a bounded channel
//! - Feeds discovered links back into the frontier
//! - Honors stop requests with a grace period

use crate::config::{validate_concurrency, Config};
use crate::crawler::extractor::Extractor;
use crate::crawler::fetcher::{FetchError, Fetcher, HttpFetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::politeness::Politeness;
use crate::crawler::retry::{with_retry, RetryPolicy};
use crate::output::{CrawlSummary, Record, Sink, SinkError};
use crate::robots::RobotsPolicy;
use crate::state::PageOutcome;
use crate::url::{domain_allowed, UrlEntry};
use crate::{ConfigError, HarvestError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use url::Url;

/// Reason recorded for URLs cut off by a stop request
pub const ABORTED: &str = "aborted";

/// Reason recorded for URLs refused by robots.txt
pub const DISALLOWED: &str = "disallowed by robots.txt";

/// Tunables for one engine
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Maximum fetches in flight
    pub concurrency: usize,

    /// Minimum spacing between requests to one host
    pub politeness_delay: Duration,

    /// Limit for a single fetch attempt
    pub request_timeout: Duration,

    pub retry: RetryPolicy,

    /// Links deeper than this are not enqueued
    pub max_depth: Option<u32>,

    /// Hosts links may point to; empty allows all
    pub allowed_domains: Vec<String>,

    /// Whether link rules feed the frontier
    pub follow_links: bool,

    /// Product token checked against robots.txt; None disables robots checks
    pub robots_agent: Option<String>,

    /// How long in-flight work may finish after a stop request
    pub grace_period: Duration,

    /// Capacity of the record channel to the sink
    pub sink_buffer: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            concurrency: 8,
            politeness_delay: Duration::ZERO,
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::none(),
            max_depth: None,
            allowed_domains: Vec::new(),
            follow_links: true,
            robots_agent: None,
            grace_period: Duration::from_secs(10),
            sink_buffer: 64,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        let crawler = &config.crawler;
        Self {
            concurrency: crawler.concurrency,
            politeness_delay: Duration::from_millis(crawler.politeness_delay_ms),
            request_timeout: Duration::from_secs(crawler.request_timeout_secs),
            retry: RetryPolicy::from_config(crawler),
            max_depth: crawler.max_depth,
            allowed_domains: crawler.allowed_domains.clone(),
            follow_links: crawler.follow_links,
            robots_agent: crawler
                .respect_robots
                .then(|| config.user_agent.crawler_name.clone()),
            grace_period: Duration::from_secs(crawler.grace_period_secs),
            sink_buffer: crawler.sink_buffer,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_concurrency(self.concurrency)?;
        if self.sink_buffer == 0 {
            return Err(ConfigError::Validation(
                "sink buffer must be at least 1".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Requests a running engine to stop
///
/// Cloneable and cheap; every clone controls the same engine.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Stops launching new work; in-flight work gets the grace period
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Resolves once the stop flag is set
async fn stop_requested(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// What one unit of work produced
#[derive(Debug)]
struct UnitResult {
    entry: UrlEntry,
    outcome: PageOutcome,
    records: Vec<Record>,
    links: Vec<Url>,
    retries: u32,
    error: Option<String>,
}

impl UnitResult {
    fn failed(entry: UrlEntry, retries: u32, reason: String) -> Self {
        Self {
            entry,
            outcome: PageOutcome::FetchFailed,
            records: Vec::new(),
            links: Vec::new(),
            retries,
            error: Some(reason),
        }
    }
}

/// The shared, immutable parts a task needs
struct Worker {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<Extractor>,
    politeness: Politeness,
    robots: Option<RobotsPolicy>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl Worker {
    /// Politeness wait, fetch with retry, extract
    async fn process(&self, entry: UrlEntry) -> UnitResult {
        let host = entry.host();
        tracing::debug!("Processing URL: {} (depth {})", entry, entry.depth());

        if let Some(robots) = &self.robots {
            let verdict = robots.check(self.fetcher.as_ref(), &host, entry.url()).await;
            if verdict.crawl_delay.is_some() {
                self.politeness.set_crawl_delay(&host, verdict.crawl_delay);
                tracing::debug!(
                    "Crawl-delay for {}: spacing requests by {:?}",
                    host,
                    self.politeness.effective_delay(&host)
                );
            }
            if !verdict.allowed {
                return UnitResult::failed(entry, 0, DISALLOWED.to_string());
            }
        }

        let url = entry.url();
        let host = host.as_str();
        let attempted = with_retry(&self.retry, move |_| async move {
            self.politeness.wait_turn(host).await;
            tracing::trace!(
                "Fetching {} (request {} to {})",
                url,
                self.politeness.request_count(host),
                host
            );
            match tokio::time::timeout(self.timeout, self.fetcher.fetch(url)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout),
            }
        })
        .await;

        let retries = attempted.retries;
        let response = match attempted.result {
            Ok(response) => response,
            Err(e) => return UnitResult::failed(entry, retries, e.to_string()),
        };

        match self
            .extractor
            .extract_body(&response.body, &response.final_url)
        {
            Ok(extraction) => UnitResult {
                outcome: if extraction.records.is_empty() {
                    PageOutcome::ExtractedEmpty
                } else {
                    PageOutcome::Emitted
                },
                entry,
                records: extraction.records,
                links: extraction.links,
                retries,
                error: None,
            },
            Err(e) => UnitResult::failed(entry, retries, e.to_string()),
        }
    }
}

/// Crawl coordinator
///
/// An engine owns its frontier, so it represents one crawl: URLs seen by an
/// earlier `run` are not fetched again.
pub struct Engine {
    settings: EngineSettings,
    frontier: Frontier,
    worker: Arc<Worker>,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl Engine {
    /// Creates an engine from explicit parts
    ///
    /// # Returns
    ///
    /// * `Ok(Engine)` - Settings are valid
    /// * `Err(ConfigError)` - Invalid concurrency, timeout or buffer size
    pub fn new(
        settings: EngineSettings,
        extractor: Extractor,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;

        let worker = Worker {
            fetcher,
            extractor: Arc::new(extractor),
            politeness: Politeness::new(settings.politeness_delay),
            robots: settings.robots_agent.as_deref().map(RobotsPolicy::new),
            retry: settings.retry.clone(),
            timeout: settings.request_timeout,
        };
        let (stop_tx, _) = watch::channel(false);

        Ok(Self {
            settings,
            frontier: Frontier::new(),
            worker: Arc::new(worker),
            stop_tx: Arc::new(stop_tx),
        })
    }

    /// Creates an engine with an HTTP fetcher and the rules embedded in `config`
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let extractor = Extractor::new(&config.rules)?;
        let fetcher = HttpFetcher::new(&config.crawler, &config.user_agent)?;
        Self::new(EngineSettings::from_config(config), extractor, Arc::new(fetcher))
    }

    /// Handle for requesting a stop from another task (e.g. a Ctrl-C handler)
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Runs the crawl to completion
    ///
    /// Terminates when the frontier is empty and nothing is in flight, or
    /// after a stop request. Per-URL failures are counted in the summary; only
    /// configuration and sink failures are returned as errors.
    ///
    /// # Arguments
    ///
    /// * `seeds` - Start URLs, in order
    /// * `sink` - Receives every record; closed before this returns
    pub async fn run<S>(&self, seeds: &[String], sink: S) -> Result<CrawlSummary, HarvestError>
    where
        S: Sink + 'static,
    {
        let started = Instant::now();
        let mut summary = CrawlSummary::new();
        self.seed(seeds, &mut summary)?;

        tracing::info!(
            "Starting crawl: {} seeds, concurrency {}",
            self.frontier.pending_len(),
            self.settings.concurrency
        );

        let (tx, rx) = mpsc::channel::<Record>(self.settings.sink_buffer);
        let sink_task = tokio::spawn(drive_sink(sink, rx));

        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency));
        let mut tasks: JoinSet<UnitResult> = JoinSet::new();
        let mut stop_rx = self.stop_tx.subscribe();
        let mut stopping = *stop_rx.borrow_and_update();
        let mut sink_failed = false;
        let mut deadline: Option<Instant> = None;

        loop {
            if !stopping && !sink_failed {
                while let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() {
                    let Some(entry) = self.frontier.dequeue() else {
                        break;
                    };
                    summary.attempted += 1;
                    let worker = Arc::clone(&self.worker);
                    tasks.spawn(async move {
                        let _permit = permit;
                        worker.process(entry).await
                    });
                }
            }

            if tasks.is_empty() {
                break;
            }

            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok(unit)) => {
                        let accept_links = !stopping && !sink_failed;
                        if !self.complete(unit, &tx, accept_links, &mut summary).await {
                            if !sink_failed {
                                tracing::error!("Sink stopped accepting records, draining in-flight work");
                            }
                            sink_failed = true;
                        }
                    }
                    Some(Err(e)) if e.is_panic() => {
                        tracing::error!("Crawl task panicked: {}", e);
                    }
                    _ => {}
                },
                _ = stop_requested(&mut stop_rx), if !stopping => {
                    tracing::info!(
                        "Stop requested, waiting up to {:?} for {} in-flight fetches",
                        self.settings.grace_period,
                        tasks.len()
                    );
                    stopping = true;
                    deadline = Some(Instant::now() + self.settings.grace_period);
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    tracing::warn!("Grace period expired, aborting {} fetches", tasks.len());
                    tasks.abort_all();
                    deadline = None;
                }
            }
        }

        drop(tx);

        // Anything still in flight was aborted or lost to a panicked task
        for key in self.frontier.in_flight() {
            let reason = if stopping { ABORTED } else { "task failed" };
            tracing::warn!("Failed {}: {}", key, reason);
            self.frontier.mark_failed(&key, reason);
            summary.failed += 1;
            if stopping {
                summary.aborted += 1;
            }
        }

        let (mut sink, delivered) = match sink_task.await {
            Ok(done) => done,
            Err(e) => {
                tracing::error!("Sink task failed: {}", e);
                return Err(SinkError::Closed.into());
            }
        };
        let delivered = match delivered {
            Ok(delivered) => delivered,
            Err(e) => {
                tracing::error!("Sink error: {}", e);
                if let Err(close_err) = sink.close(false).await {
                    tracing::warn!("Failed to close sink after error: {}", close_err);
                }
                return Err(e.into());
            }
        };
        sink.close(!stopping).await?;

        summary.records = delivered;
        summary.stopped = stopping;
        summary.elapsed = started.elapsed();
        summary.log();
        Ok(summary)
    }

    fn seed(&self, seeds: &[String], summary: &mut CrawlSummary) -> Result<(), ConfigError> {
        if seeds.is_empty() {
            return Err(ConfigError::NoSeeds);
        }

        let entries = seeds
            .iter()
            .map(|seed| {
                UrlEntry::seed(seed).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", seed, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for entry in entries {
            let key = entry.key().to_string();
            if !self.frontier.enqueue(entry) {
                tracing::debug!("Duplicate seed {} ignored", key);
                summary.duplicate_seeds += 1;
            }
        }
        Ok(())
    }

    /// Applies one finished unit to the sink, frontier and summary
    ///
    /// Returns false if the sink is gone.
    async fn complete(
        &self,
        unit: UnitResult,
        tx: &mpsc::Sender<Record>,
        accept_links: bool,
        summary: &mut CrawlSummary,
    ) -> bool {
        let UnitResult {
            entry,
            outcome,
            records,
            links,
            retries,
            error,
        } = unit;

        summary.retries += u64::from(retries);
        summary.record_outcome(outcome, records.len());

        let mut sink_open = true;
        for record in records {
            if tx.send(record).await.is_err() {
                sink_open = false;
                break;
            }
        }

        if accept_links && sink_open {
            self.enqueue_links(&entry, links, summary);
        }

        match outcome {
            PageOutcome::Emitted | PageOutcome::ExtractedEmpty => {
                tracing::debug!("Finished {}: {}", entry, outcome);
                self.frontier.mark_done(entry.key());
            }
            PageOutcome::FetchFailed => {
                let reason = error.unwrap_or_else(|| "unknown".to_string());
                tracing::warn!("Failed {}: {}", entry, reason);
                self.frontier.mark_failed(entry.key(), &reason);
            }
        }

        sink_open
    }

    fn enqueue_links(&self, parent: &UrlEntry, links: Vec<Url>, summary: &mut CrawlSummary) {
        if !self.settings.follow_links || links.is_empty() {
            return;
        }

        let depth = parent.depth() + 1;
        if self.settings.max_depth.is_some_and(|max| depth > max) {
            summary.links_filtered += links.len() as u64;
            return;
        }

        for link in links {
            let entry = match UrlEntry::from_url(link, depth) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping link from {}: {}", parent, e);
                    continue;
                }
            };

            if !domain_allowed(&entry.domain(), &self.settings.allowed_domains) {
                tracing::trace!("Offsite link {} dropped", entry);
                summary.links_filtered += 1;
                continue;
            }

            if self.frontier.enqueue(entry) {
                summary.links_discovered += 1;
            } else {
                summary.duplicates += 1;
            }
        }
    }
}

/// Feeds records from the channel to the sink until the channel closes
///
/// Returns the sink (for closing, also after a failure) and the number of
/// records it accepted. On error the receiver is dropped, which fails the
/// engine's next send.
async fn drive_sink<S: Sink>(
    mut sink: S,
    mut rx: mpsc::Receiver<Record>,
) -> (S, Result<u64, SinkError>) {
    let mut delivered = 0u64;
    while let Some(record) = rx.recv().await {
        if let Err(e) = sink.accept(record).await {
            return (sink, Err(e));
        }
        delivered += 1;
    }
    let flushed = sink.flush().await.map(|_| delivered);
    (sink, flushed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Multiplicity, RuleConfig, RuleSetConfig};
    use crate::crawler::FetchResponse;
    use crate::output::MemorySink;
    use crate::state::VisitState;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Serves fixed pages from memory; unknown URLs are 404
    struct StaticFetcher {
        pages: HashMap<String, String>,
    }

    impl StaticFetcher {
        fn new(pages: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                pages: pages
                    .iter()
                    .map(|(u, b)| (u.to_string(), b.to_string()))
                    .collect(),
            })
        }
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError> {
            match self.pages.get(url.as_str()) {
                Some(body) => Ok(FetchResponse {
                    final_url: url.clone(),
                    status: 200,
                    content_type: Some("text/html".to_string()),
                    body: body.as_bytes().to_vec(),
                }),
                None => Err(FetchError::HttpError(404)),
            }
        }
    }

    fn title_rules() -> RuleSetConfig {
        RuleSetConfig {
            item: None,
            rules: vec![
                RuleConfig::field("title", "h1", Multiplicity::Single),
                RuleConfig::link("links", "a"),
            ],
        }
    }

    fn engine(settings: EngineSettings, fetcher: Arc<dyn Fetcher>) -> Engine {
        Engine::new(settings, Extractor::new(&title_rules()).unwrap(), fetcher).unwrap()
    }

    fn seeds(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    #[tokio::test]
    async fn test_follows_links_and_dedupes() {
        let fetcher = StaticFetcher::new(&[
            ("http://site.test/", r#"<h1>Home</h1><a href="/a">A</a><a href="/b">B</a>"#),
            ("http://site.test/a", r#"<h1>A</h1><a href="/">Home</a><a href="/b">B</a>"#),
            ("http://site.test/b", r#"<h1>B</h1>"#),
        ]);
        let engine = engine(EngineSettings::default(), fetcher);
        let sink = MemorySink::new();

        let summary = engine
            .run(&seeds(&["http://site.test/"]), sink.clone())
            .await
            .unwrap();

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.pages_emitted, 3);
        assert_eq!(summary.records, 3);
        assert_eq!(summary.links_discovered, 2);
        assert!(summary.duplicates >= 2);
        assert_eq!(sink.len(), 3);
        assert!(engine
            .frontier()
            .snapshot()
            .iter()
            .all(|(_, state)| *state == VisitState::Done));
    }

    #[tokio::test]
    async fn test_max_depth_limits_links() {
        let fetcher = StaticFetcher::new(&[
            ("http://site.test/", r#"<h1>0</h1><a href="/1">1</a>"#),
            ("http://site.test/1", r#"<h1>1</h1><a href="/2">2</a>"#),
            ("http://site.test/2", r#"<h1>2</h1>"#),
        ]);
        let settings = EngineSettings {
            max_depth: Some(1),
            ..EngineSettings::default()
        };
        let engine = engine(settings, fetcher);

        let summary = engine
            .run(&seeds(&["http://site.test/"]), MemorySink::new())
            .await
            .unwrap();

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.links_filtered, 1);
        assert!(!engine.frontier().contains("http://site.test/2"));
    }

    #[tokio::test]
    async fn test_follow_links_disabled() {
        let fetcher = StaticFetcher::new(&[("http://site.test/", r#"<h1>0</h1><a href="/1">1</a>"#)]);
        let settings = EngineSettings {
            follow_links: false,
            ..EngineSettings::default()
        };
        let summary = engine(settings, fetcher)
            .run(&seeds(&["http://site.test/"]), MemorySink::new())
            .await
            .unwrap();

        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.links_discovered, 0);
    }

    #[tokio::test]
    async fn test_offsite_links_filtered() {
        let fetcher = StaticFetcher::new(&[(
            "http://site.test/",
            r#"<h1>0</h1><a href="http://other.test/">x</a><a href="http://sub.site.test/">y</a>"#,
        )]);
        let settings = EngineSettings {
            allowed_domains: vec!["site.test".to_string()],
            ..EngineSettings::default()
        };
        let engine = engine(settings, fetcher);
        let summary = engine
            .run(&seeds(&["http://site.test/"]), MemorySink::new())
            .await
            .unwrap();

        assert_eq!(summary.links_filtered, 1);
        assert!(engine.frontier().contains("http://sub.site.test/"));
        assert!(!engine.frontier().contains("http://other.test/"));
    }

    #[tokio::test]
    async fn test_failures_are_recorded_not_returned() {
        let fetcher = StaticFetcher::new(&[("http://site.test/", r#"<h1>0</h1><a href="/gone">x</a>"#)]);
        let engine = engine(EngineSettings::default(), fetcher);
        let summary = engine
            .run(&seeds(&["http://site.test/"]), MemorySink::new())
            .await
            .unwrap();

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            engine.frontier().state("http://site.test/gone"),
            Some(VisitState::Failed("HTTP 404".to_string()))
        );
    }

    #[tokio::test]
    async fn test_empty_seeds_is_config_error() {
        let engine = engine(EngineSettings::default(), StaticFetcher::new(&[]));
        let result = engine.run(&[], MemorySink::new()).await;
        assert!(matches!(
            result,
            Err(HarvestError::Config(ConfigError::NoSeeds))
        ));
    }

    #[tokio::test]
    async fn test_invalid_seed_is_config_error() {
        let engine = engine(EngineSettings::default(), StaticFetcher::new(&[]));
        let result = engine
            .run(&seeds(&["ftp://site.test/"]), MemorySink::new())
            .await;
        assert!(matches!(
            result,
            Err(HarvestError::Config(ConfigError::InvalidUrl(_)))
        ));
        assert_eq!(engine.frontier().counts().total(), 0);
    }

    #[test]
    fn test_invalid_concurrency_rejected() {
        let settings = EngineSettings {
            concurrency: 0,
            ..EngineSettings::default()
        };
        let result = Engine::new(
            settings,
            Extractor::new(&title_rules()).unwrap(),
            StaticFetcher::new(&[]),
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidConcurrency { value: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_stop_before_run_launches_nothing() {
        let fetcher = StaticFetcher::new(&[("http://site.test/", "<h1>0</h1>")]);
        let engine = engine(EngineSettings::default(), fetcher);
        let handle = engine.stop_handle();
        handle.stop();
        assert!(handle.is_stopped());

        let summary = engine
            .run(&seeds(&["http://site.test/"]), MemorySink::new())
            .await
            .unwrap();
        assert_eq!(summary.attempted, 0);
        assert!(summary.stopped);
    }

    /// Records when each fetch starts
    struct TimedFetcher {
        starts: std::sync::Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl Fetcher for TimedFetcher {
        async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError> {
            self.starts.lock().unwrap().push(Instant::now());
            Ok(FetchResponse {
                final_url: url.clone(),
                status: 200,
                content_type: Some("text/html".to_string()),
                body: b"<h1>page</h1>".to_vec(),
            })
        }
    }

    #[tokio::test]
    async fn test_query_fetched_as_written_and_deduped() {
        let fetcher = StaticFetcher::new(&[
            ("http://site.test/", r#"<h1>Home</h1><a href="/a">A</a><a href="/p?flag">P</a>"#),
            ("http://site.test/a", r##"<h1>A</h1><a href="/p?flag#top">P</a>"##),
            ("http://site.test/p?flag", "<h1>P</h1>"),
        ]);
        let engine = engine(EngineSettings::default(), fetcher);

        let summary = engine
            .run(&seeds(&["http://site.test/"]), MemorySink::new())
            .await
            .unwrap();

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(
            engine.frontier().state("http://site.test/p?flag="),
            Some(VisitState::Done)
        );
    }

    #[tokio::test]
    async fn test_duplicate_seeds_counted_apart_from_links() {
        let fetcher = StaticFetcher::new(&[("http://site.test/", "<h1>0</h1>")]);
        let summary = engine(EngineSettings::default(), fetcher)
            .run(
                &seeds(&["http://site.test/", "http://SITE.test/#again"]),
                MemorySink::new(),
            )
            .await
            .unwrap();

        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.duplicate_seeds, 1);
        assert_eq!(summary.duplicates, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_politeness_spaces_fetches_to_one_host() {
        let fetcher = Arc::new(TimedFetcher {
            starts: std::sync::Mutex::new(Vec::new()),
        });
        let settings = EngineSettings {
            concurrency: 4,
            politeness_delay: Duration::from_secs(2),
            follow_links: false,
            ..EngineSettings::default()
        };
        let engine = Engine::new(
            settings,
            Extractor::new(&title_rules()).unwrap(),
            fetcher.clone(),
        )
        .unwrap();

        let summary = engine
            .run(
                &seeds(&["http://site.test/1", "http://site.test/2", "http://site.test/3"]),
                MemorySink::new(),
            )
            .await
            .unwrap();
        assert_eq!(summary.pages_emitted, 3);

        let mut starts = fetcher.starts.lock().unwrap().clone();
        starts.sort();
        assert_eq!(starts.len(), 3);
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(2));
        }
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.crawler.concurrency = 3;
        config.crawler.respect_robots = true;
        config.crawler.politeness_delay_ms = 250;
        config.user_agent.crawler_name = "QuoteBot".to_string();

        let settings = EngineSettings::from_config(&config);
        assert_eq!(settings.concurrency, 3);
        assert_eq!(settings.politeness_delay, Duration::from_millis(250));
        assert_eq!(settings.robots_agent.as_deref(), Some("QuoteBot"));
    }
}
