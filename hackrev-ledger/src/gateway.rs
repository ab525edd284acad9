//! Submission Gateway
//!
//! The only entry point that creates records. Validation is a pure function
//! ([`validate_submission`]) so transports can pre-check input; the gateway
//! itself only adds the hand-off to [`LedgerStore::commit`].

use crate::error::{LedgerError, Result};
use crate::ledger::LedgerStore;
use crate::record::{RecordId, ReviewDraft, MAX_RATING, MIN_RATING};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Review as submitted by a caller, before validation
///
/// `rating` is a wide signed integer so out-of-range values reach validation
/// instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReviewSubmission {
    pub reviewer: String,
    pub reviewee: String,
    pub hackathon: String,
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
    pub technologies: Vec<String>,
    #[serde(default)]
    pub project_url: Option<String>,
}

/// Validate and normalize a submission
///
/// Identities, hackathon and project URL are trimmed; each technology is
/// trimmed and blank entries are dropped. Duplicate technologies are kept.
pub fn validate_submission(submission: ReviewSubmission) -> Result<ReviewDraft> {
    let reviewer = required("reviewer", &submission.reviewer)?;
    let reviewee = required("reviewee", &submission.reviewee)?;
    let hackathon = required("hackathon", &submission.hackathon)?;

    let rating = u8::try_from(submission.rating)
        .ok()
        .filter(|r| (MIN_RATING..=MAX_RATING).contains(r))
        .ok_or_else(|| {
            LedgerError::validation(format!(
                "rating must be between {} and {}, got {}",
                MIN_RATING, MAX_RATING, submission.rating
            ))
        })?;

    let technologies: Vec<String> = submission
        .technologies
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if technologies.is_empty() {
        return Err(LedgerError::validation(
            "at least one non-blank technology is required",
        ));
    }

    let project_url = submission
        .project_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string);

    Ok(ReviewDraft::new(
        reviewer,
        reviewee,
        hackathon,
        rating,
        submission.comment,
        technologies,
        project_url,
    ))
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(LedgerError::validation(format!("{} must not be empty", field)))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Stateless front door to the ledger
#[derive(Clone)]
pub struct SubmissionGateway {
    ledger: Arc<LedgerStore>,
}

impl SubmissionGateway {
    pub fn new(ledger: Arc<LedgerStore>) -> Self {
        Self { ledger }
    }

    /// Validate `submission` and commit it
    ///
    /// Invalid input is rejected with [`LedgerError::Validation`] and never
    /// reaches the ledger.
    pub async fn submit(&self, submission: ReviewSubmission) -> Result<RecordId> {
        let draft = validate_submission(submission).map_err(|e| {
            debug!(error = %e, "Rejected review submission");
            e
        })?;
        self.ledger.commit(draft).await
    }
}
