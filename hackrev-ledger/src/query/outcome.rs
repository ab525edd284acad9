//! Fan-out search result types

use crate::ordering::SortOrder;
use crate::record::{ReviewRecord, TagKey};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Why one requested tag did not resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum TagFailure {
    /// The tag index returned an error, or the lookup task died
    Lookup(String),
    /// The caller's cancellation token fired first
    Cancelled,
    /// The search deadline passed first
    TimedOut,
}

impl fmt::Display for TagFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagFailure::Lookup(detail) => write!(f, "lookup failed: {}", detail),
            TagFailure::Cancelled => f.write_str("cancelled"),
            TagFailure::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Merged fan-out result
///
/// `records` holds everything the resolved tags produced; tags in
/// `failed_tags` contributed nothing. Retrying only the failed tags and
/// merging is safe because records are immutable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    pub records: Vec<ReviewRecord>,
    pub failed_tags: BTreeMap<TagKey, TagFailure>,
}

impl SearchOutcome {
    /// At least one tag failed to resolve
    pub fn is_partial(&self) -> bool {
        !self.failed_tags.is_empty()
    }

    /// Normalized names of the failed tags, ascending
    pub fn failed_tag_names(&self) -> Vec<String> {
        self.failed_tags.keys().map(|k| k.to_string()).collect()
    }

    pub fn sorted(mut self, order: SortOrder) -> Self {
        order.apply(&mut self.records);
        self
    }
}
