//! SQLite record sink
//!
//! Each run gets a row in `runs` (with the rule set fingerprint); each record
//! is stored in `records` as its JSON object alongside the source URL.

use crate::output::traits::{Sink, SinkResult};
use crate::output::Record;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

/// SQL schema for the record database
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    rules_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    source_url TEXT NOT NULL,
    data TEXT NOT NULL,
    extracted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_run ON records(run_id);
CREATE INDEX IF NOT EXISTS idx_records_source ON records(source_url);
"#;

/// Records buffered before an implicit flush
const BATCH_SIZE: usize = 100;

/// Writes records to a SQLite database in batched transactions
pub struct SqliteSink {
    conn: Connection,
    run_id: i64,
    pending: Vec<(String, String, String)>,
}

impl SqliteSink {
    /// Opens (or creates) the database at `path` and starts a run
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `rules_hash` - Fingerprint of the rule set driving this run
    pub fn open(path: &Path, rules_hash: &str) -> SinkResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        Self::with_connection(conn, rules_hash)
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory(rules_hash: &str) -> SinkResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::with_connection(conn, rules_hash)
    }

    fn with_connection(conn: Connection, rules_hash: &str) -> SinkResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        conn.execute(
            "INSERT INTO runs (started_at, rules_hash, status) VALUES (?1, ?2, ?3)",
            params![Utc::now().to_rfc3339(), rules_hash, "running"],
        )?;
        let run_id = conn.last_insert_rowid();

        Ok(Self {
            conn,
            run_id,
            pending: Vec::new(),
        })
    }

    /// Id of the run row this sink writes under
    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    fn write_pending(&mut self) -> SinkResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO records (run_id, source_url, data, extracted_at) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (source, data, at) in &self.pending {
                stmt.execute(params![self.run_id, source, data, at])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Wrote {} records to run {}", self.pending.len(), self.run_id);
        self.pending.clear();
        Ok(())
    }
}

#[async_trait]
impl Sink for SqliteSink {
    async fn accept(&mut self, record: Record) -> SinkResult<()> {
        let data = serde_json::to_string(&record)?;
        self.pending
            .push((record.source().to_string(), data, Utc::now().to_rfc3339()));
        if self.pending.len() >= BATCH_SIZE {
            self.write_pending()?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> SinkResult<()> {
        self.write_pending()
    }

    async fn close(&mut self, completed: bool) -> SinkResult<()> {
        let written = self.write_pending();
        let status = match (&written, completed) {
            (Err(_), _) => "failed",
            (Ok(()), true) => "completed",
            (Ok(()), false) => "stopped",
        };
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status, Utc::now().to_rfc3339(), self.run_id],
        )?;
        written
    }
}
