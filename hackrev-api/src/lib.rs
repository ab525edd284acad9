//! hackrev-api library - HTTP front end for the review ledger
//!
//! Exposes the Submission Gateway and Query Engine as a JSON API plus an SSE
//! stream of ledger events. All review semantics live in `hackrev-ledger`;
//! this crate only maps requests and errors.

use axum::Router;
use hackrev_common::EventBus;
use hackrev_ledger::{LedgerStore, QueryEngine, SubmissionGateway};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerStore>,
    pub gateway: SubmissionGateway,
    pub queries: QueryEngine,
    /// Same bus the ledger publishes commits on
    pub events: Arc<EventBus>,
    /// Default fan-out deadline for `/api/search`
    pub search_timeout: Duration,
}

impl AppState {
    /// Create application state over `ledger`
    ///
    /// `ledger` should already publish on `events` (see
    /// [`LedgerStore::with_events`]) or SSE clients will see nothing.
    pub fn new(ledger: Arc<LedgerStore>, events: Arc<EventBus>, search_timeout: Duration) -> Self {
        Self {
            gateway: SubmissionGateway::new(ledger.clone()),
            queries: QueryEngine::new(ledger.clone()),
            ledger,
            events,
            search_timeout,
        }
    }
}

/// Build application router
///
/// CORS is permissive so browser front ends on other origins can call in.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/reviews", post(api::submit_review))
        .route("/api/reviews/:id", get(api::get_review))
        .route("/api/reviewees/:reviewee/reviews", get(api::reviews_of))
        .route("/api/reviewees/:reviewee/summary", get(api::reviewee_summary))
        .route("/api/search", get(api::search_by_tags))
        .route("/api/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
