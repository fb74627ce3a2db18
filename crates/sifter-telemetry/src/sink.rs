//! Persistence sinks for flushed collector batches.

use crate::Entry;
use async_trait::async_trait;
use thiserror::Error;

/// Sink errors.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The backend rejected or failed to store the batch.
    #[error("sink backend error: {0}")]
    Backend(String),
}

/// A destination for flushed collector batches.
///
/// Database-backed sinks (the `mysql` / `mariadb` config backends, a
/// bulk `INSERT` into a `queries` table) live outside this crate and
/// plug in through this trait.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Prepares the backend (schema, connections). Called once at startup.
    async fn prepare(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Stores a flushed batch.
    async fn store(&self, entries: Vec<Entry>) -> Result<(), SinkError>;
}

/// The default sink: discards every batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

#[async_trait]
impl Sink for DiscardSink {
    async fn store(&self, _entries: Vec<Entry>) -> Result<(), SinkError> {
        Ok(())
    }
}
