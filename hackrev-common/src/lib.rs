//! # HackReview Common Library
//!
//! Shared code for the HackReview crates:
//! - Error type
//! - Configuration loading and root folder resolution
//! - SQLite database initialization
//! - Ledger events (EventBus) and SSE helpers
//! - Time utilities

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
pub use events::{EventBus, LedgerEvent};
