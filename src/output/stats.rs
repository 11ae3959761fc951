//! Run statistics
//!
//! The engine fills a [`CrawlSummary`] as units of work complete and returns
//! it when the run ends.

use crate::state::PageOutcome;
use std::time::Duration;

/// Counters describing one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// URLs handed to a worker
    pub attempted: u64,

    /// URLs whose fetch succeeded
    pub fetched: u64,

    /// URLs that ended Failed (fetch, parse, robots or abort)
    pub failed: u64,

    /// Pages that produced at least one record
    pub pages_emitted: u64,

    /// Pages that were extracted but produced no records
    pub pages_empty: u64,

    /// Records delivered to the sink
    pub records: u64,

    /// New URLs added to the frontier from link rules
    pub links_discovered: u64,

    /// Discovered links that were already known
    pub duplicates: u64,

    /// Seeds repeating an earlier seed
    pub duplicate_seeds: u64,

    /// Discovered links dropped by depth or domain filters
    pub links_filtered: u64,

    /// Retries performed across all URLs
    pub retries: u64,

    /// In-flight URLs aborted after a stop request
    pub aborted: u64,

    /// Whether the run ended because of a stop request
    pub stopped: bool,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl CrawlSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one finished unit of work
    pub fn record_outcome(&mut self, outcome: PageOutcome, records: usize) {
        match outcome {
            PageOutcome::Emitted => {
                self.fetched += 1;
                self.pages_emitted += 1;
                self.records += records as u64;
            }
            PageOutcome::ExtractedEmpty => {
                self.fetched += 1;
                self.pages_empty += 1;
            }
            PageOutcome::FetchFailed => self.failed += 1,
        }
    }

    /// Percentage of attempted URLs that were fetched and extracted
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        (self.pages_emitted + self.pages_empty) as f64 / self.attempted as f64 * 100.0
    }

    /// Emits the summary as a single log event
    pub fn log(&self) {
        tracing::info!(
            attempted = self.attempted,
            fetched = self.fetched,
            failed = self.failed,
            pages_emitted = self.pages_emitted,
            pages_empty = self.pages_empty,
            records = self.records,
            links = self.links_discovered,
            duplicates = self.duplicates,
            duplicate_seeds = self.duplicate_seeds,
            retries = self.retries,
            aborted = self.aborted,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "Crawl finished"
        );
    }
}

/// Prints a summary to stderr in a formatted manner
///
/// Stderr keeps stdout free for records when the JSON Lines sink writes there.
pub fn print_summary(summary: &CrawlSummary) {
    eprintln!("=== Crawl Summary ===\n");

    eprintln!("Pages:");
    eprintln!("  Attempted: {}", summary.attempted);
    eprintln!("  Fetched: {}", summary.fetched);
    eprintln!("  Failed: {}", summary.failed);
    eprintln!("  With records: {}", summary.pages_emitted);
    eprintln!("  Without records: {}", summary.pages_empty);
    if summary.aborted > 0 {
        eprintln!("  Aborted: {}", summary.aborted);
    }
    eprintln!();

    eprintln!("Records: {}", summary.records);
    eprintln!(
        "Links: {} new, {} duplicate, {} filtered",
        summary.links_discovered, summary.duplicates, summary.links_filtered
    );
    if summary.duplicate_seeds > 0 {
        eprintln!("Duplicate seeds: {}", summary.duplicate_seeds);
    }
    eprintln!("Retries: {}", summary.retries);
    eprintln!();

    eprintln!(
        "Success Rate: {:.1}% ({} / {} pages) in {:.2}s{}",
        summary.success_rate(),
        summary.pages_emitted + summary.pages_empty,
        summary.attempted,
        summary.elapsed.as_secs_f64(),
        if summary.stopped { " (stopped)" } else { "" }
    );
}
