//! Result ordering
//!
//! Pure post-processing over query output. Never touches the store.

use crate::record::ReviewRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Order produced by the query (tie-break order for fan-out, commit
    /// order for point queries)
    #[default]
    Relevance,
    /// `submitted_at` descending
    #[serde(alias = "recent")]
    MostRecent,
    /// `rating` descending
    #[serde(alias = "rating")]
    HighestRated,
}

impl SortOrder {
    /// Stable sort of `records` in place
    pub fn apply(self, records: &mut [ReviewRecord]) {
        match self {
            SortOrder::Relevance => {}
            SortOrder::MostRecent => records.sort_by_key(|r| Reverse(r.submitted_at)),
            SortOrder::HighestRated => records.sort_by_key(|r| Reverse(r.rating)),
        }
    }

    /// Consuming variant of [`SortOrder::apply`]
    pub fn sorted(self, mut records: Vec<ReviewRecord>) -> Vec<ReviewRecord> {
        self.apply(&mut records);
        records
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Relevance => "relevance",
            SortOrder::MostRecent => "most_recent",
            SortOrder::HighestRated => "highest_rated",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "relevance" => Ok(SortOrder::Relevance),
            "recent" | "most_recent" => Ok(SortOrder::MostRecent),
            "rating" | "highest_rated" => Ok(SortOrder::HighestRated),
            other => Err(format!(
                "unknown sort '{}' (expected relevance, recent or rating)",
                other
            )),
        }
    }
}
