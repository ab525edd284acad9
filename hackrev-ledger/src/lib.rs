//! # HackReview Ledger
//!
//! Append-only store of peer reviews written about hackathon collaborators.
//!
//! Components, leaves first:
//! - [`record`]: the immutable [`ReviewRecord`] value and tag normalization
//! - [`ledger`]: [`LedgerStore`], id assignment plus ByReviewee/ByTag indices
//! - [`query`]: [`QueryEngine`], point lookup and multi-tag fan-out search
//! - [`ordering`]: [`SortOrder`], pure post-processing of query output
//! - [`gateway`]: [`SubmissionGateway`], the only mutation entry point
//! - [`persistence`]: the [`LedgerBackend`] boundary to durable storage

pub mod error;
pub mod gateway;
pub mod ledger;
pub mod ordering;
pub mod persistence;
pub mod query;
pub mod record;

pub use error::{LedgerError, Result};
pub use gateway::{validate_submission, ReviewSubmission, SubmissionGateway};
pub use ledger::LedgerStore;
pub use ordering::SortOrder;
pub use persistence::{LedgerBackend, MemoryBackend, SqliteBackend};
pub use query::{
    QueryEngine, RevieweeSummary, SearchOutcome, TagFailure, TagIndex, TechnologyCount,
};
pub use record::{DedupKey, RecordId, ReviewDraft, ReviewRecord, TagKey, MAX_RATING, MIN_RATING};
