//! In-memory sink

use crate::output::traits::{Sink, SinkResult};
use crate::output::Record;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

/// Collects records in memory
///
/// Clones share the same buffer, so a caller can keep one clone and hand the
/// other to the engine.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<Record>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything accepted so far, in arrival order
    pub fn records(&self) -> Vec<Record> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Record>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn accept(&mut self, record: Record) -> SinkResult<()> {
        self.lock().push(record);
        Ok(())
    }

    async fn flush(&mut self) -> SinkResult<()> {
        Ok(())
    }
}
