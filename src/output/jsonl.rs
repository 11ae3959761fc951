//! Newline-delimited JSON output

use crate::output::traits::{Sink, SinkResult};
use crate::output::Record;
use async_trait::async_trait;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter, Stdout};

/// Writes one JSON object per line
#[derive(Debug)]
pub struct JsonLinesSink<W: AsyncWrite + Unpin + Send> {
    writer: BufWriter<W>,
    written: u64,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesSink<W> {
    /// Wraps any async writer
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            written: 0,
        }
    }

    /// Number of records written so far
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl JsonLinesSink<File> {
    /// Creates (or truncates) the file at `path`
    pub async fn create(path: &Path) -> SinkResult<Self> {
        let file = File::create(path).await?;
        Ok(Self::new(file))
    }
}

impl JsonLinesSink<Stdout> {
    /// Writes to standard output
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Sink for JsonLinesSink<W> {
    async fn accept(&mut self, record: Record) -> SinkResult<()> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.written += 1;
        Ok(())
    }

    async fn flush(&mut self) -> SinkResult<()> {
        self.writer.flush().await?;
        Ok(())
    }
}
