//! Sink trait and errors
//!
//! A sink consumes the record stream of one run. The engine drives it from a
//! single task, so implementations need `Send` but not `Sync`.

use crate::output::Record;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while writing records
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Sink is closed")]
    Closed,
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Consumer of extracted records
#[async_trait]
pub trait Sink: Send {
    /// Takes ownership of one record
    async fn accept(&mut self, record: Record) -> SinkResult<()>;

    /// Makes every accepted record durable
    async fn flush(&mut self) -> SinkResult<()>;

    /// Called once when the run ends; `completed` is false after a stop request
    async fn close(&mut self, completed: bool) -> SinkResult<()> {
        let _ = completed;
        self.flush().await
    }
}

#[async_trait]
impl<S: Sink + ?Sized> Sink for Box<S> {
    async fn accept(&mut self, record: Record) -> SinkResult<()> {
        (**self).accept(record).await
    }

    async fn flush(&mut self) -> SinkResult<()> {
        (**self).flush().await
    }

    async fn close(&mut self, completed: bool) -> SinkResult<()> {
        (**self).close(completed).await
    }
}
