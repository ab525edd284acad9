//! HTTP API handlers

pub mod health;
pub mod reviews;
pub mod search;
pub mod sse;

pub use health::health_routes;
pub use reviews::{get_review, reviewee_summary, reviews_of, submit_review};
pub use search::search_by_tags;
pub use sse::event_stream;

/// Split a comma-separated query parameter
///
/// An absent or empty parameter is an empty list; surrounding whitespace is
/// kept so the ledger can reject blank entries.
pub(crate) fn split_list(param: Option<&str>) -> Vec<String> {
    match param {
        None => Vec::new(),
        Some(raw) if raw.trim().is_empty() => Vec::new(),
        Some(raw) => raw.split(',').map(str::to_string).collect(),
    }
}
