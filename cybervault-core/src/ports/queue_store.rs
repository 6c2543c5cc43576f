//! Queue store port - durable local storage for offline transactions

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{QueueEntry, QueuedTransaction};

/// Key-less, insertion-ordered collection of pending transactions
///
/// Entries are never mutated in place. Each one gets an internal sequence
/// number on append, which is the only handle used to remove it again.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append one entry, returning once it is durably persisted
    async fn enqueue(&self, tx: &QueuedTransaction) -> Result<i64>;

    /// Snapshot of every queued entry in insertion order, without removing any
    async fn drain_all(&self) -> Result<Vec<QueueEntry>>;

    /// Remove the given entries in one atomic step
    async fn remove(&self, seqs: &[i64]) -> Result<usize>;

    /// Remove every entry
    async fn clear(&self) -> Result<()>;

    /// Number of queued entries
    async fn len(&self) -> Result<usize>;
}
