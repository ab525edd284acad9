//! Ledger Store
//!
//! Owns the primary records and both secondary indices. [`LedgerStore::commit`]
//! is the only mutation path:
//!
//! 1. take the async commit lock (one commit at a time, ids gap-free)
//! 2. stamp the draft with the next id and the commit time
//! 3. append to the [`LedgerBackend`] (write-ahead)
//! 4. publish record + index entries under the state write lock
//! 5. emit [`LedgerEvent::ReviewCommitted`]
//!
//! Readers take the state read lock only for the duration of one lookup, so a
//! reader sees the full pre-commit or full post-commit state.

mod index;

use crate::error::{LedgerError, Result};
use crate::persistence::{LedgerBackend, MemoryBackend};
use crate::query::TagIndex;
use crate::record::{RecordId, ReviewDraft, ReviewRecord, TagKey};
use async_trait::async_trait;
use hackrev_common::events::{EventBus, LedgerEvent};
use hackrev_common::time;
use index::LedgerState;
use std::sync::{Arc, RwLock, RwLockReadGuard};
use tokio::sync::Mutex;
use tracing::{error, info};

pub struct LedgerStore {
    state: RwLock<LedgerState>,
    /// Held across the backend append
    commit_lock: Mutex<()>,
    backend: Arc<dyn LedgerBackend>,
    events: Option<Arc<EventBus>>,
}

impl LedgerStore {
    /// Empty store backed by a [`MemoryBackend`]
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            commit_lock: Mutex::new(()),
            backend: Arc::new(MemoryBackend::new()),
            events: None,
        }
    }

    /// Open a store over `backend`, replaying everything it holds
    ///
    /// Fails with [`LedgerError::Persistence`] if the backend cannot be read,
    /// holds a record violating the field invariants, or its ids are not the
    /// gap-free sequence 1, 2, 3, ...
    pub async fn open(backend: Arc<dyn LedgerBackend>) -> Result<Self> {
        let records = backend.load_all().await?;
        let mut state = LedgerState::default();
        for record in records {
            record.check_invariants().map_err(replay_error)?;
            state.insert(record).map_err(replay_error)?;
        }

        info!(
            backend = backend.name(),
            records = state.len(),
            tags = state.tag_count(),
            "Opened review ledger"
        );

        Ok(Self {
            state: RwLock::new(state),
            commit_lock: Mutex::new(()),
            backend,
            events: None,
        })
    }

    /// Publish a [`LedgerEvent`] on `events` after every commit
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Commit a validated draft and return its id
    ///
    /// A backend failure is a [`LedgerError::Commit`]; the id is not consumed
    /// and readers never see the record.
    pub async fn commit(&self, draft: ReviewDraft) -> Result<RecordId> {
        let _serial = self.commit_lock.lock().await;

        let id = self
            .read_state()
            .next_id()
            .ok_or_else(|| LedgerError::Commit("record id space exhausted".to_string()))?;
        let record = draft.into_record(id, time::now());

        if let Err(e) = self.backend.append(&record).await {
            error!(
                id = %id,
                backend = self.backend.name(),
                error = %e,
                "Backend rejected review append"
            );
            return Err(LedgerError::Commit(format!(
                "{} backend append failed: {}",
                self.backend.name(),
                e
            )));
        }

        let reviewee = record.reviewee.clone();
        let tag_count = record.tag_keys().len();
        let event = self.events.as_ref().map(|_| LedgerEvent::ReviewCommitted {
            id: id.get(),
            reviewer: record.reviewer.clone(),
            reviewee: record.reviewee.clone(),
            hackathon: record.hackathon.clone(),
            technologies: record.technologies.clone(),
            timestamp: record.submitted_at,
        });

        {
            let mut state = self
                .state
                .write()
                .map_err(|_| LedgerError::Commit("ledger state lock poisoned".to_string()))?;
            state.insert(record).map_err(|msg| {
                error!(id = %id, error = %msg, "Durable review could not be published");
                LedgerError::Commit(msg)
            })?;
        }

        info!(id = %id, reviewee = %reviewee, tags = tag_count, "Committed review");

        if let (Some(bus), Some(event)) = (&self.events, event) {
            bus.publish(event);
        }
        Ok(id)
    }

    pub fn get_by_id(&self, id: RecordId) -> Result<ReviewRecord> {
        self.read_state()
            .get(id)
            .cloned()
            .ok_or(LedgerError::NotFound(id))
    }

    /// Every review of `reviewee`, oldest first; empty for an unknown reviewee
    pub fn reviews_of(&self, reviewee: &str) -> Vec<ReviewRecord> {
        self.read_state().reviews_of(reviewee)
    }

    /// Every record carrying `tag`, ascending id
    pub fn records_tagged(&self, tag: &TagKey) -> Vec<ReviewRecord> {
        self.read_state().tagged(tag)
    }

    pub fn len(&self) -> usize {
        self.read_state().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct normalized tags in the ByTag index
    pub fn tag_count(&self) -> usize {
        self.read_state().tag_count()
    }

    /// Cross-check ByReviewee and ByTag against the primary records
    pub fn check_consistency(&self) -> std::result::Result<(), String> {
        self.read_state().check_consistency()
    }

    // State is only mutated by `LedgerState::insert`, which validates before
    // touching anything, so a poisoned lock still guards consistent data.
    fn read_state(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TagIndex for LedgerStore {
    async fn lookup(&self, tag: &TagKey) -> Result<Vec<ReviewRecord>> {
        Ok(self.records_tagged(tag))
    }
}

fn replay_error(msg: String) -> LedgerError {
    LedgerError::Persistence(hackrev_common::Error::InvalidInput(format!(
        "ledger replay: {}",
        msg
    )))
}
