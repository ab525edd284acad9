//! Persistence boundary for the ledger
//!
//! The ledger keeps its published state in memory and hands every commit to
//! a [`LedgerBackend`] first (write-ahead). A backend only has to support
//! atomic append-with-index-update, full replay in id order, and point read.

use crate::record::{RecordId, ReviewRecord};
use async_trait::async_trait;
use hackrev_common::Result;

mod memory;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// Durable storage behind a [`LedgerStore`](crate::LedgerStore)
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// Backend identifier for logs (e.g., "memory", "sqlite")
    fn name(&self) -> &'static str;

    /// Append one record together with its technology rows
    ///
    /// Must be atomic: after an error nothing of the record is stored.
    async fn append(&self, record: &ReviewRecord) -> Result<()>;

    /// Every stored record in ascending id order
    async fn load_all(&self) -> Result<Vec<ReviewRecord>>;

    /// Point read by id
    async fn read(&self, id: RecordId) -> Result<Option<ReviewRecord>>;
}
