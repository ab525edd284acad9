//! Query Engine
//!
//! Two read contracts over the ledger:
//!
//! - **Point query**: every review of one reviewee, served straight from the
//!   ByReviewee index.
//! - **Fan-out search**: one concurrent [`TagIndex`] lookup per distinct
//!   requested tag, merged into a single de-duplicated [`SearchOutcome`].
//!
//! # Fan-out merge
//!
//! Every lookup runs as its own task in a [`JoinSet`]. The merge waits for
//! all of them (or for cancellation/deadline), then walks the tags in caller
//! order and each tag's records in ascending id order, keeping the first
//! record seen for each [`DedupKey`](crate::record::DedupKey). A tag whose
//! lookup fails lands in `failed_tags` and contributes nothing; the other
//! tags are unaffected.

mod outcome;
mod summary;

pub use outcome::{SearchOutcome, TagFailure};
pub use summary::{RevieweeSummary, TechnologyCount};

use crate::error::{LedgerError, Result};
use crate::ledger::LedgerStore;
use crate::record::{ReviewRecord, TagKey};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Per-tag lookup seam for fan-out search
///
/// [`LedgerStore`] implements it in-process. A remote or sharded index plugs
/// in here; its failures become per-tag [`TagFailure::Lookup`] entries.
#[async_trait]
pub trait TagIndex: Send + Sync {
    /// Every record carrying `tag`
    async fn lookup(&self, tag: &TagKey) -> Result<Vec<ReviewRecord>>;
}

#[derive(Clone)]
pub struct QueryEngine {
    ledger: Arc<LedgerStore>,
    index: Arc<dyn TagIndex>,
}

impl QueryEngine {
    /// Engine whose fan-out reads the ledger's own ByTag index
    pub fn new(ledger: Arc<LedgerStore>) -> Self {
        let index: Arc<dyn TagIndex> = ledger.clone();
        Self { ledger, index }
    }

    /// Engine whose fan-out goes through `index`
    pub fn with_tag_index(ledger: Arc<LedgerStore>, index: Arc<dyn TagIndex>) -> Self {
        Self { ledger, index }
    }

    /// Every review of `reviewee`, oldest first
    pub fn reviews_of(&self, reviewee: &str) -> Vec<ReviewRecord> {
        self.ledger.reviews_of(reviewee)
    }

    /// Reviews of `reviewee` where every filter is a case-insensitive
    /// substring of some technology
    ///
    /// Blank filters are ignored, so no filters returns the full list.
    pub fn reviews_of_matching<S: AsRef<str>>(
        &self,
        reviewee: &str,
        filters: &[S],
    ) -> Vec<ReviewRecord> {
        let needles: Vec<String> = filters
            .iter()
            .map(|f| f.as_ref().trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect();

        let mut reviews = self.ledger.reviews_of(reviewee);
        if !needles.is_empty() {
            reviews.retain(|review| {
                let technologies: Vec<String> =
                    review.technologies.iter().map(|t| t.to_lowercase()).collect();
                needles
                    .iter()
                    .all(|needle| technologies.iter().any(|t| t.contains(needle.as_str())))
            });
        }
        reviews
    }

    pub fn summary_of(&self, reviewee: &str) -> RevieweeSummary {
        RevieweeSummary::from_reviews(reviewee, &self.ledger.reviews_of(reviewee))
    }

    /// Fan-out search with no deadline
    ///
    /// A blank tag is a [`LedgerError::Validation`]; an empty tag list is an
    /// empty outcome.
    pub async fn search_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> Result<SearchOutcome> {
        self.fan_out(tags, std::future::pending::<TagFailure>()).await
    }

    /// Fan-out search that stops when `cancel` fires
    ///
    /// Results already merged are kept; outstanding tags are reported as
    /// [`TagFailure::Cancelled`].
    pub async fn search_by_tags_until<S: AsRef<str>>(
        &self,
        tags: &[S],
        cancel: CancellationToken,
    ) -> Result<SearchOutcome> {
        self.fan_out(tags, async move {
            cancel.cancelled().await;
            TagFailure::Cancelled
        })
        .await
    }

    /// Fan-out search with a deadline
    ///
    /// Outstanding tags at the deadline are reported as
    /// [`TagFailure::TimedOut`].
    pub async fn search_by_tags_within<S: AsRef<str>>(
        &self,
        tags: &[S],
        timeout: Duration,
    ) -> Result<SearchOutcome> {
        self.fan_out(tags, async move {
            tokio::time::sleep(timeout).await;
            TagFailure::TimedOut
        })
        .await
    }

    async fn fan_out<S, F>(&self, tags: &[S], stop: F) -> Result<SearchOutcome>
    where
        S: AsRef<str>,
        F: Future<Output = TagFailure>,
    {
        let keys = request_keys(tags)?;
        if keys.is_empty() {
            return Ok(SearchOutcome::default());
        }

        let mut slots: Vec<Slot> = (0..keys.len()).map(|_| None).collect();

        let mut lookups = JoinSet::new();
        for (slot, key) in keys.iter().enumerate() {
            let index = Arc::clone(&self.index);
            let key = key.clone();
            lookups.spawn(async move {
                let result = index.lookup(&key).await;
                (slot, result)
            });
        }

        tokio::pin!(stop);
        let interrupted = loop {
            tokio::select! {
                biased;

                joined = lookups.join_next() => match joined {
                    Some(joined) => fill_slot(&mut slots, joined),
                    None => break None,
                },
                reason = &mut stop => break Some(reason),
            }
        };

        if interrupted.is_some() {
            // Keep lookups that finished alongside the stop signal
            while let Some(joined) = lookups.try_join_next() {
                fill_slot(&mut slots, joined);
            }
            lookups.abort_all();
        }

        let outcome = merge(keys, slots, interrupted.as_ref());
        if outcome.is_partial() {
            warn!(
                failed = ?outcome.failed_tag_names(),
                records = outcome.records.len(),
                "Partial tag search"
            );
        } else {
            debug!(records = outcome.records.len(), "Tag search complete");
        }
        Ok(outcome)
    }
}

type Slot = Option<std::result::Result<Vec<ReviewRecord>, TagFailure>>;

fn fill_slot(
    slots: &mut [Slot],
    joined: std::result::Result<(usize, Result<Vec<ReviewRecord>>), tokio::task::JoinError>,
) {
    match joined {
        Ok((slot, result)) => {
            slots[slot] = Some(result.map_err(|e| TagFailure::Lookup(e.to_string())));
        }
        // Slot stays empty; reported by `merge`
        Err(e) => warn!(error = %e, "Tag lookup task did not complete"),
    }
}

/// Normalize requested tags, keeping the first occurrence of each key
fn request_keys<S: AsRef<str>>(tags: &[S]) -> Result<Vec<TagKey>> {
    let mut seen = HashSet::new();
    let mut keys = Vec::with_capacity(tags.len());
    for (position, tag) in tags.iter().enumerate() {
        let key = TagKey::normalize(tag.as_ref()).ok_or_else(|| {
            LedgerError::validation(format!("search tag at position {} is blank", position))
        })?;
        if seen.insert(key.clone()) {
            keys.push(key);
        }
    }
    Ok(keys)
}

fn merge(
    keys: Vec<TagKey>,
    slots: Vec<Slot>,
    interrupted: Option<&TagFailure>,
) -> SearchOutcome {
    let mut seen = HashSet::new();
    let mut records = Vec::new();
    let mut failed_tags = BTreeMap::new();

    for (key, slot) in keys.into_iter().zip(slots) {
        match slot {
            Some(Ok(mut hits)) => {
                debug!(tag = %key, hits = hits.len(), "Tag lookup resolved");
                hits.sort_by_key(|r| r.id);
                for record in hits {
                    if seen.insert(record.dedup_key()) {
                        records.push(record);
                    }
                }
            }
            Some(Err(failure)) => {
                failed_tags.insert(key, failure);
            }
            None => {
                let failure = interrupted
                    .cloned()
                    .unwrap_or_else(|| TagFailure::Lookup("lookup task aborted".to_string()));
                failed_tags.insert(key, failure);
            }
        }
    }

    SearchOutcome { records, failed_tags }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{validate_submission, ReviewSubmission};

    async fn commit(ledger: &LedgerStore, reviewer: &str, reviewee: &str, technologies: &[&str]) {
        let draft = validate_submission(ReviewSubmission {
            reviewer: reviewer.to_string(),
            reviewee: reviewee.to_string(),
            hackathon: "ETHGlobal".to_string(),
            rating: 4,
            comment: String::new(),
            technologies: technologies.iter().map(|t| t.to_string()).collect(),
            project_url: None,
        })
        .unwrap();
        ledger.commit(draft).await.unwrap();
    }

    /// Index whose "go" lookup signals just before it returns
    struct SignallingIndex {
        inner: Arc<LedgerStore>,
        done: std::sync::Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
    }

    #[async_trait]
    impl TagIndex for SignallingIndex {
        async fn lookup(&self, tag: &TagKey) -> Result<Vec<ReviewRecord>> {
            let hits = self.inner.lookup(tag).await?;
            if tag.as_str() == "go" {
                tokio::time::sleep(Duration::from_millis(10)).await;
                if let Some(tx) = self.done.lock().unwrap().take() {
                    let _ = tx.send(());
                }
            }
            Ok(hits)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lookup_finishing_with_stop_signal_is_kept() {
        let ledger = Arc::new(LedgerStore::in_memory());
        commit(&ledger, "bob", "alice", &["React"]).await;
        commit(&ledger, "carol", "dave", &["Go"]).await;

        let (tx, rx) = tokio::sync::oneshot::channel();
        let index = Arc::new(SignallingIndex {
            inner: ledger.clone(),
            done: std::sync::Mutex::new(Some(tx)),
        });
        let engine = QueryEngine::with_tag_index(ledger, index);

        // Stop fires only after the "go" lookup has produced its result
        let stop = async move {
            let _ = rx.await;
            std::thread::sleep(Duration::from_millis(20));
            TagFailure::TimedOut
        };

        let outcome = engine.fan_out(&["react", "go"], stop).await.unwrap();
        assert!(!outcome.is_partial(), "failed: {:?}", outcome.failed_tag_names());
        assert_eq!(outcome.records.len(), 2);
    }

    #[test]
    fn test_request_keys_dedup_and_validation() {
        let keys = request_keys(&["React", " react ", "Go"]).unwrap();
        let names: Vec<_> = keys.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["react", "go"]);

        assert!(matches!(
            request_keys(&["React", "  "]),
            Err(LedgerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_tag_list() {
        let engine = QueryEngine::new(Arc::new(LedgerStore::in_memory()));
        let outcome = engine.search_by_tags::<&str>(&[]).await.unwrap();
        assert!(outcome.records.is_empty());
        assert!(!outcome.is_partial());
    }

    #[tokio::test]
    async fn test_reviews_of_matching_substring_filters() {
        let ledger = Arc::new(LedgerStore::in_memory());
        commit(&ledger, "bob", "alice", &["React Native", "Solidity"]).await;
        commit(&ledger, "carol", "alice", &["React"]).await;
        commit(&ledger, "dave", "alice", &["Go"]).await;
        let engine = QueryEngine::new(ledger);

        let hits = engine.reviews_of_matching("alice", &["react"]);
        assert_eq!(hits.len(), 2);

        // Every filter must match some tag
        let hits = engine.reviews_of_matching("alice", &["REACT", "sol"]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].reviewer, "bob");

        assert_eq!(engine.reviews_of_matching("alice", &["", "  "]).len(), 3);
        assert!(engine.reviews_of_matching("nobody", &["react"]).is_empty());
    }

    #[tokio::test]
    async fn test_summary_of() {
        let ledger = Arc::new(LedgerStore::in_memory());
        commit(&ledger, "bob", "alice", &["Solidity"]).await;
        commit(&ledger, "carol", "alice", &["solidity", "React"]).await;
        let engine = QueryEngine::new(ledger);

        let summary = engine.summary_of("alice");
        assert_eq!(summary.review_count, 2);
        assert_eq!(summary.average_rating, Some(4.0));
        assert_eq!(summary.technologies[0].technology, "Solidity");
        assert_eq!(summary.technologies[0].count, 2);

        assert_eq!(engine.summary_of("nobody").average_rating, None);
    }
}
