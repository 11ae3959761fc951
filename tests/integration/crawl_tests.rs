//! Integration tests for the crawler
//!
//! These tests drive the full engine end-to-end, against wiremock servers and
//! against instrumented in-process fetchers.

use async_trait::async_trait;
use harvest::config::{CrawlerConfig, Multiplicity, RuleConfig, RuleSetConfig, UserAgentConfig};
use harvest::crawler::{
    EngineSettings, FetchError, FetchResponse, Fetcher, HttpFetcher, RetryPolicy, ABORTED,
    DISALLOWED,
};
use harvest::output::{JsonLinesSink, MemorySink, SinkError, SinkResult, SqliteSink};
use harvest::{ConfigError, Engine, Extractor, FieldValue, HarvestError, Record, Sink, VisitState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUOTES_PAGE: &str = r#"<html><head><title>Quotes to Scrape</title></head><body>
<div class="quote">
    <span class="text">“The world as we have created it is a process of our thinking.”</span>
    <span>by <small class="author">Albert Einstein</small></span>
    <div class="tags">
        Tags:
        <a class="tag" href="/tag/change/page/1/">change</a>
        <a class="tag" href="/tag/deep-thoughts/page/1/">deep-thoughts</a>
        <a class="tag" href="/tag/thinking/page/1/">thinking</a>
    </div>
</div>
<div class="quote">
    <span class="text">“It is our choices, Harry, that show what we truly are.”</span>
    <span>by <small class="author">J.K. Rowling</small></span>
    <div class="tags">
        Tags:
        <a class="tag" href="/tag/abilities/page/1/">abilities</a>
        <a class="tag" href="/tag/choices/page/1/">choices</a>
    </div>
</div>
<nav><ul class="pager"><li class="next"><a href="/page/2/">Next</a></li></ul></nav>
</body></html>"#;

fn quote_rules() -> RuleSetConfig {
    RuleSetConfig {
        item: Some("div.quote".to_string()),
        rules: vec![
            RuleConfig::field("text", "span.text::text", Multiplicity::Single),
            RuleConfig::field("author", "small.author::text", Multiplicity::Single),
            RuleConfig::field("tags", "div.tags a.tag::text", Multiplicity::All),
            RuleConfig::link("next", "li.next a"),
        ],
    }
}

fn settings() -> EngineSettings {
    EngineSettings {
        concurrency: 4,
        request_timeout: Duration::from_secs(5),
        ..EngineSettings::default()
    }
}

fn http_fetcher() -> Arc<dyn Fetcher> {
    let crawler = CrawlerConfig {
        request_timeout_secs: 5,
        ..CrawlerConfig::default()
    };
    let user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: None,
    };
    Arc::new(HttpFetcher::new(&crawler, &user_agent).expect("Failed to build fetcher"))
}

fn engine_with(settings: EngineSettings, fetcher: Arc<dyn Fetcher>) -> Engine {
    let extractor = Extractor::new(&quote_rules()).expect("Rules should compile");
    Engine::new(settings, extractor, fetcher).expect("Settings should be valid")
}

async fn mount_html(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Fetcher that always fails and counts calls
#[derive(Default)]
struct FailingFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl Fetcher for FailingFetcher {
    async fn fetch(&self, _url: &Url) -> Result<FetchResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::ConnectionRefused)
    }
}

/// Fetcher that records how many fetches overlap
struct GaugeFetcher {
    current: AtomicUsize,
    max: AtomicUsize,
    delay: Duration,
}

impl GaugeFetcher {
    fn new(delay: Duration) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max: AtomicUsize::new(0),
            delay,
        }
    }
}

#[async_trait]
impl Fetcher for GaugeFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.current.fetch_sub(1, Ordering::SeqCst);

        Ok(FetchResponse {
            final_url: url.clone(),
            status: 200,
            content_type: Some("text/html".to_string()),
            body: QUOTES_PAGE.as_bytes().to_vec(),
        })
    }
}

/// Fetcher serving the quotes page at once, except for hosts named `slow*`
struct SplitFetcher;

#[async_trait]
impl Fetcher for SplitFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        if url.host_str().is_some_and(|h| h.starts_with("slow")) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok(FetchResponse {
            final_url: url.clone(),
            status: 200,
            content_type: Some("text/html".to_string()),
            body: QUOTES_PAGE.as_bytes().to_vec(),
        })
    }
}

/// Sink that rejects every record and remembers how it was closed
#[derive(Default)]
struct BrokenSink {
    closed: Arc<Mutex<Option<bool>>>,
}

#[async_trait]
impl Sink for BrokenSink {
    async fn accept(&mut self, _record: Record) -> SinkResult<()> {
        Err(SinkError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }

    async fn flush(&mut self) -> SinkResult<()> {
        Ok(())
    }

    async fn close(&mut self, completed: bool) -> SinkResult<()> {
        *self.closed.lock().unwrap() = Some(completed);
        Ok(())
    }
}

fn fast_and_slow_seeds() -> Vec<String> {
    vec![
        "http://fast0.test/".to_string(),
        "http://fast1.test/".to_string(),
        "http://slow.test/".to_string(),
    ]
}

/// Runs with a stop request once the fast seeds have had time to finish
async fn run_then_stop<S: Sink + 'static>(sink: S) -> (Engine, harvest::CrawlSummary) {
    let settings = EngineSettings {
        follow_links: false,
        grace_period: Duration::from_millis(50),
        ..settings()
    };
    let engine = engine_with(settings, Arc::new(SplitFetcher));
    let stop = engine.stop_handle();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        stop.stop();
    });

    let summary = tokio::time::timeout(Duration::from_secs(5), engine.run(&fast_and_slow_seeds(), sink))
        .await
        .expect("Stop should end the run promptly")
        .expect("A stopped run is not an error");
    (engine, summary)
}

fn text_of(record: &Record) -> Option<&str> {
    record.get("text").and_then(FieldValue::as_str)
}

#[tokio::test]
async fn test_quotes_page_yields_one_record_per_block() {
    let server = MockServer::start().await;
    mount_html(&server, "/page/1/", QUOTES_PAGE).await;

    let settings = EngineSettings {
        follow_links: false,
        ..settings()
    };
    let engine = engine_with(settings, http_fetcher());
    let sink = MemorySink::new();

    let summary = engine
        .run(&[format!("{}/page/1/", server.uri())], sink.clone())
        .await
        .expect("Crawl should succeed");

    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.pages_emitted, 1);
    assert_eq!(summary.records, 2);

    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| text_of(r).is_some()));
    assert_eq!(
        records[0].get("tags").and_then(FieldValue::as_list),
        Some(&["change".to_string(), "deep-thoughts".to_string(), "thinking".to_string()][..])
    );
    assert_eq!(
        records[1].get("author").and_then(FieldValue::as_str),
        Some("J.K. Rowling")
    );
}

#[tokio::test]
async fn test_pagination_is_followed_and_written_as_json_lines() {
    let server = MockServer::start().await;
    mount_html(&server, "/page/1/", QUOTES_PAGE).await;
    mount_html(
        &server,
        "/page/2/",
        r#"<html><body>
        <div class="quote">
            <span class="text">“A day without sunshine is like, you know, night.”</span>
            <span>by <small class="author">Steve Martin</small></span>
            <div class="tags">Tags: <a class="tag" href="/tag/humor/page/1/">humor</a></div>
        </div>
        </body></html>"#,
    )
    .await;

    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let out = dir.path().join("quotes.jsonl");
    let sink = JsonLinesSink::create(&out).await.expect("Failed to create sink");

    let engine = engine_with(settings(), http_fetcher());
    let summary = engine
        .run(&[format!("{}/page/1/", server.uri())], sink)
        .await
        .expect("Crawl should succeed");

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.records, 3);
    assert_eq!(summary.links_discovered, 1);

    let content = std::fs::read_to_string(&out).expect("Output should exist");
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).expect("Each line is JSON"))
        .collect();
    assert_eq!(lines.len(), 3);
    assert!(lines
        .iter()
        .any(|v| v["author"] == "Steve Martin" && v["tags"] == serde_json::json!(["humor"])));
}

#[tokio::test]
async fn test_always_failing_fetcher_terminates_cleanly() {
    let fetcher = Arc::new(FailingFetcher::default());
    let engine = engine_with(settings(), fetcher.clone());

    let summary = engine
        .run(&["http://unreachable.test/".to_string()], MemorySink::new())
        .await
        .expect("Per-URL failures are not errors");

    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.pages_emitted, 0);
    assert_eq!(summary.failed, 1);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    assert!(matches!(
        engine.frontier().state("http://unreachable.test/"),
        Some(VisitState::Failed(_))
    ));
}

#[tokio::test]
async fn test_retryable_failures_are_retried() {
    let fetcher = Arc::new(FailingFetcher::default());
    let settings = EngineSettings {
        retry: RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        },
        ..settings()
    };
    let engine = engine_with(settings, fetcher.clone());

    let summary = engine
        .run(&["http://unreachable.test/".to_string()], MemorySink::new())
        .await
        .expect("Per-URL failures are not errors");

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    assert_eq!(summary.retries, 2);
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn test_transient_server_error_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page/1/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_html(&server, "/page/1/", QUOTES_PAGE).await;

    let settings = EngineSettings {
        follow_links: false,
        retry: RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
        },
        ..settings()
    };
    let summary = engine_with(settings, http_fetcher())
        .run(&[format!("{}/page/1/", server.uri())], MemorySink::new())
        .await
        .expect("Crawl should succeed");

    assert_eq!(summary.retries, 1);
    assert_eq!(summary.pages_emitted, 1);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn test_empty_seed_list_fetches_nothing() {
    let fetcher = Arc::new(FailingFetcher::default());
    let engine = engine_with(settings(), fetcher.clone());

    let result = engine.run(&[], MemorySink::new()).await;

    assert!(matches!(
        result,
        Err(HarvestError::Config(ConfigError::NoSeeds))
    ));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_concurrency_limit_is_respected() {
    let fetcher = Arc::new(GaugeFetcher::new(Duration::from_millis(20)));
    let settings = EngineSettings {
        concurrency: 3,
        follow_links: false,
        ..settings()
    };
    let engine = engine_with(settings, fetcher.clone());
    let seeds: Vec<String> = (0..20)
        .map(|i| format!("http://site{}.test/", i))
        .collect();

    let summary = engine
        .run(&seeds, MemorySink::new())
        .await
        .expect("Crawl should succeed");

    let max = fetcher.max.load(Ordering::SeqCst);
    assert!(max <= 3, "saw {} concurrent fetches", max);
    assert!(max > 1, "fetches never overlapped");
    assert_eq!(summary.attempted, 20);
    assert_eq!(summary.records, 40);
}

#[tokio::test]
async fn test_every_dequeued_url_ends_terminal() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r#"<html><body>
        <li class="next"><a href="/ok">ok</a></li>
        <li class="next"><a href="/missing">missing</a></li>
        <li class="next"><a href="/ok?b=2&a=1">ok again</a></li>
        </body></html>"#,
    )
    .await;
    mount_html(&server, "/ok", QUOTES_PAGE).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let engine = engine_with(settings(), http_fetcher());
    engine
        .run(&[format!("{}/", server.uri())], MemorySink::new())
        .await
        .expect("Crawl should succeed");

    let snapshot = engine.frontier().snapshot();
    assert!(!snapshot.is_empty());
    for (url, state) in &snapshot {
        assert!(state.is_terminal(), "{} ended {}", url, state);
    }
    assert!(engine.frontier().in_flight().is_empty());
    assert!(engine.frontier().is_empty());
}

#[tokio::test]
async fn test_robots_disallow_is_honored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_html(
        &server,
        "/",
        r#"<li class="next"><a href="/private/page">secret</a></li>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let settings = EngineSettings {
        robots_agent: Some("TestBot".to_string()),
        ..settings()
    };
    let engine = engine_with(settings, http_fetcher());
    let summary = engine
        .run(&[format!("{}/", server.uri())], MemorySink::new())
        .await
        .expect("Crawl should succeed");

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(
        engine
            .frontier()
            .state(&format!("{}/private/page", server.uri())),
        Some(VisitState::Failed(DISALLOWED.to_string()))
    );
}

#[tokio::test]
async fn test_sink_failure_is_fatal() {
    let fetcher = Arc::new(GaugeFetcher::new(Duration::from_millis(1)));
    let engine = engine_with(settings(), fetcher);
    let sink = BrokenSink::default();
    let closed = Arc::clone(&sink.closed);

    let result = engine.run(&["http://site.test/".to_string()], sink).await;

    assert!(matches!(result, Err(HarvestError::Sink(SinkError::Io(_)))));
    assert_eq!(*closed.lock().unwrap(), Some(false));
}

#[tokio::test]
async fn test_stop_keeps_records_finished_before_it() {
    let sink = MemorySink::new();
    let (engine, summary) = run_then_stop(sink.clone()).await;

    assert!(summary.stopped);
    assert_eq!(summary.pages_emitted, 2);
    assert_eq!(summary.aborted, 1);
    assert_eq!(summary.records, 4);
    assert_eq!(sink.len(), 4);
    assert_eq!(
        engine.frontier().state("http://slow.test/"),
        Some(VisitState::Failed(ABORTED.to_string()))
    );
}

#[tokio::test]
async fn test_stopped_run_is_marked_in_sqlite() {
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let db = dir.path().join("records.db");
    let sink = SqliteSink::open(&db, "test-hash").expect("Failed to open database");

    let (_, summary) = run_then_stop(sink).await;
    assert_eq!(summary.records, 4);

    let conn = rusqlite::Connection::open(&db).expect("Database should exist");
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
        .expect("Query should succeed");
    assert_eq!(count, 4);

    let status: String = conn
        .query_row("SELECT status FROM runs", [], |row| row.get(0))
        .expect("Query should succeed");
    assert_eq!(status, "stopped");
}

#[tokio::test]
async fn test_stop_aborts_after_grace_period() {
    let fetcher = Arc::new(GaugeFetcher::new(Duration::from_secs(30)));
    let settings = EngineSettings {
        concurrency: 2,
        grace_period: Duration::from_millis(50),
        ..settings()
    };
    let engine = engine_with(settings, fetcher);
    let stop = engine.stop_handle();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.stop();
    });

    let seeds: Vec<String> = (0..5).map(|i| format!("http://slow{}.test/", i)).collect();
    let summary = tokio::time::timeout(Duration::from_secs(5), engine.run(&seeds, MemorySink::new()))
        .await
        .expect("Stop should end the run promptly")
        .expect("A stopped run is not an error");

    assert!(summary.stopped);
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.aborted, 2);
    let aborted = engine
        .frontier()
        .snapshot()
        .into_iter()
        .filter(|(_, state)| *state == VisitState::Failed(ABORTED.to_string()))
        .count();
    assert_eq!(aborted, 2);
}

#[tokio::test]
async fn test_sqlite_sink_end_to_end() {
    let server = MockServer::start().await;
    mount_html(&server, "/page/1/", QUOTES_PAGE).await;

    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let db = dir.path().join("records.db");
    let sink = SqliteSink::open(&db, "test-hash").expect("Failed to open database");

    let settings = EngineSettings {
        follow_links: false,
        ..settings()
    };
    engine_with(settings, http_fetcher())
        .run(&[format!("{}/page/1/", server.uri())], sink)
        .await
        .expect("Crawl should succeed");

    let conn = rusqlite::Connection::open(&db).expect("Database should exist");
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
        .expect("Query should succeed");
    assert_eq!(count, 2);

    let status: String = conn
        .query_row("SELECT status FROM runs", [], |row| row.get(0))
        .expect("Query should succeed");
    assert_eq!(status, "completed");
}
