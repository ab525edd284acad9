//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Liveness plus a few ledger gauges
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub backend: String,
    pub reviews: usize,
    /// Connected `/api/events` clients
    pub sse_clients: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "hackrev-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.ledger.backend_name().to_string(),
        reviews: state.ledger.len(),
        sse_clients: state.events.subscriber_count(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
