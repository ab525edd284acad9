//! Review record model
//!
//! [`ReviewRecord`] is immutable once committed. A [`ReviewDraft`] is the
//! validated, not-yet-committed form; it can only be produced by
//! [`validate_submission`](crate::gateway::validate_submission), so the
//! ledger never sees unvalidated input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Lowest accepted star rating
pub const MIN_RATING: u8 = 1;
/// Highest accepted star rating
pub const MAX_RATING: u8 = 5;

/// Ledger-assigned record identifier
///
/// Ids start at 1, are strictly increasing in commit order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    /// Id assigned to the first commit
    pub const FIRST: RecordId = RecordId(1);

    pub const fn new(value: u64) -> Self {
        RecordId(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Following id, `None` on overflow
    pub(crate) fn next(self) -> Option<RecordId> {
        self.0.checked_add(1).map(RecordId)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalized technology tag (trimmed, lower-cased)
///
/// Used as the ByTag index key and for every case-insensitive comparison.
/// Display casing stays on the record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TagKey(String);

impl TagKey {
    /// Normalize a raw tag, `None` if it is blank
    ///
    /// # Examples
    /// ```
    /// use hackrev_ledger::TagKey;
    ///
    /// assert_eq!(TagKey::normalize("  React ").unwrap().as_str(), "react");
    /// assert!(TagKey::normalize("   ").is_none());
    /// ```
    pub fn normalize(raw: &str) -> Option<TagKey> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(TagKey(trimmed.to_lowercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive match against a stored display tag
    pub fn matches(&self, tag: &str) -> bool {
        TagKey::normalize(tag).as_ref() == Some(self)
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one logical review across overlapping tag matches
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub reviewer: String,
    pub reviewee: String,
    pub hackathon: String,
}

/// Validated review awaiting commit (a record without id and timestamp)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    reviewer: String,
    reviewee: String,
    hackathon: String,
    rating: u8,
    comment: String,
    technologies: Vec<String>,
    project_url: Option<String>,
}

impl ReviewDraft {
    /// Caller guarantees the field invariants (see `validate_submission`)
    pub(crate) fn new(
        reviewer: String,
        reviewee: String,
        hackathon: String,
        rating: u8,
        comment: String,
        technologies: Vec<String>,
        project_url: Option<String>,
    ) -> Self {
        Self {
            reviewer,
            reviewee,
            hackathon,
            rating,
            comment,
            technologies,
            project_url,
        }
    }

    pub fn reviewer(&self) -> &str {
        &self.reviewer
    }

    pub fn reviewee(&self) -> &str {
        &self.reviewee
    }

    pub fn hackathon(&self) -> &str {
        &self.hackathon
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn technologies(&self) -> &[String] {
        &self.technologies
    }

    pub fn project_url(&self) -> Option<&str> {
        self.project_url.as_deref()
    }

    /// Stamp the draft with its ledger id and commit time
    pub(crate) fn into_record(self, id: RecordId, submitted_at: DateTime<Utc>) -> ReviewRecord {
        ReviewRecord {
            id,
            reviewer: self.reviewer,
            reviewee: self.reviewee,
            hackathon: self.hackathon,
            rating: self.rating,
            comment: self.comment,
            technologies: self.technologies,
            project_url: self.project_url,
            submitted_at,
        }
    }
}

/// Committed peer review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: RecordId,
    pub reviewer: String,
    pub reviewee: String,
    pub hackathon: String,
    pub rating: u8,
    pub comment: String,
    /// Original casing and order; duplicates are kept
    pub technologies: Vec<String>,
    pub project_url: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl ReviewRecord {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            reviewer: self.reviewer.clone(),
            reviewee: self.reviewee.clone(),
            hackathon: self.hackathon.clone(),
        }
    }

    /// Distinct normalized tags of this record
    pub fn tag_keys(&self) -> BTreeSet<TagKey> {
        self.technologies
            .iter()
            .filter_map(|t| TagKey::normalize(t))
            .collect()
    }

    pub fn has_tag(&self, key: &TagKey) -> bool {
        self.technologies.iter().any(|t| key.matches(t))
    }

    /// Check the field invariants a committed record must satisfy
    ///
    /// Used when replaying records from a backend, which may hold data
    /// written by something other than this crate.
    pub(crate) fn check_invariants(&self) -> std::result::Result<(), String> {
        if self.reviewer.trim().is_empty() || self.reviewee.trim().is_empty() {
            return Err(format!("record {} has an empty identity", self.id));
        }
        if self.hackathon.trim().is_empty() {
            return Err(format!("record {} has an empty hackathon", self.id));
        }
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(format!("record {} has rating {}", self.id, self.rating));
        }
        if self.technologies.is_empty() || self.technologies.iter().any(|t| t.trim().is_empty()) {
            return Err(format!("record {} has missing or blank technologies", self.id));
        }
        Ok(())
    }
}
