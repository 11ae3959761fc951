//! Output module: records, sinks and run summaries
//!
//! This module handles:
//! - The record type produced by extraction
//! - The `Sink` trait and its JSON Lines, SQLite and in-memory implementations
//! - Run statistics

mod jsonl;
mod memory;
mod record;
mod sqlite_output;
pub mod stats;
mod traits;

pub use jsonl::JsonLinesSink;
pub use memory::MemorySink;
pub use record::{FieldValue, Record};
pub use sqlite_output::SqliteSink;
pub use stats::{print_summary, CrawlSummary};
pub use traits::{Sink, SinkError, SinkResult};

use crate::config::{OutputConfig, OutputFormat};
use std::path::Path;

/// Opens the sink described by the output configuration
///
/// JSON Lines without a path writes to stdout. SQLite requires a path.
///
/// # Arguments
///
/// * `output` - Output format and destination
/// * `rules_hash` - Rule set fingerprint, stored by sinks that keep run metadata
pub async fn open_sink(output: &OutputConfig, rules_hash: &str) -> SinkResult<Box<dyn Sink>> {
    match (output.format, output.path.as_deref()) {
        (OutputFormat::Jsonl, Some(path)) => {
            tracing::info!("Writing JSON Lines to {}", path);
            Ok(Box::new(JsonLinesSink::create(Path::new(path)).await?))
        }
        (OutputFormat::Jsonl, None) => Ok(Box::new(JsonLinesSink::stdout())),
        (OutputFormat::Sqlite, Some(path)) => {
            tracing::info!("Writing records to SQLite database {}", path);
            Ok(Box::new(SqliteSink::open(Path::new(path), rules_hash)?))
        }
        (OutputFormat::Sqlite, None) => Err(SinkError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "sqlite output requires an output path",
        ))),
    }
}
