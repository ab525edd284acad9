//! Event types for the HackReview event system
//!
//! The ledger publishes an event after every commit becomes visible to
//! readers. Events are broadcast via [`EventBus`] and serialize to JSON for
//! SSE transmission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Ledger event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    /// A review was committed and is now visible to queries
    ///
    /// Triggers:
    /// - SSE: profile pages refresh the reviewee's review list
    ReviewCommitted {
        /// Ledger-assigned record id
        id: u64,
        /// Author identity
        reviewer: String,
        /// Subject identity
        reviewee: String,
        /// Event display name
        hackathon: String,
        /// Technology tags, original casing
        technologies: Vec<String>,
        /// Commit timestamp
        timestamp: DateTime<Utc>,
    },
}

impl LedgerEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::ReviewCommitted { .. } => "ReviewCommitted",
        }
    }
}

/// Fan-out of committed-review notifications to SSE clients
///
/// Backed by a tokio `broadcast` channel: a client that falls more than
/// `capacity` events behind skips the oldest ones.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<LedgerEvent>,
}

impl EventBus {
    /// # Examples
    ///
    /// ```
    /// use hackrev_common::events::EventBus;
    ///
    /// let bus = EventBus::new(256);
    /// assert_eq!(bus.subscriber_count(), 0);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Receiver for events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.tx.subscribe()
    }

    /// Publish to every current subscriber, returning how many were reached
    ///
    /// Nobody listening is not an error; the event is dropped.
    pub fn publish(&self, event: LedgerEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
