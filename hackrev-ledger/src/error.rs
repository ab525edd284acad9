//! Error types for hackrev-ledger
//!
//! Partial fan-out failure is deliberately absent: it is reported as
//! [`SearchOutcome::failed_tags`](crate::query::SearchOutcome) metadata, not
//! as an error.

use crate::record::RecordId;
use thiserror::Error;

/// Ledger error type
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Malformed or out-of-range input; nothing was applied
    #[error("Validation error: {0}")]
    Validation(String),

    /// No record with this id
    #[error("Review not found: {0}")]
    NotFound(RecordId),

    /// Commit could not complete; the serialization discipline was violated
    /// or the backend refused the append
    #[error("Commit failure: {0}")]
    Commit(String),

    /// Backend failure while opening or replaying the ledger
    #[error("Persistence error: {0}")]
    Persistence(#[from] hackrev_common::Error),
}

impl LedgerError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        LedgerError::Validation(msg.into())
    }
}

/// Convenience Result type using LedgerError
pub type Result<T> = std::result::Result<T, LedgerError>;
