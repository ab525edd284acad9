//! Server-Sent Events (SSE) for ledger commits

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /api/events - SSE stream of ledger events
///
/// Streams events:
/// - ConnectionStatus (once, on connect)
/// - ReviewCommitted (after each commit becomes visible)
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    hackrev_common::sse::create_event_sse_stream("hackrev-api", state.events.subscribe())
}
