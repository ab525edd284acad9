//! Server-Sent Events (SSE) utilities

use crate::events::LedgerEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

/// Create an SSE stream forwarding [`LedgerEvent`]s from a broadcast receiver
///
/// The stream opens with a `ConnectionStatus` event, then forwards every
/// ledger event as JSON named by [`LedgerEvent::event_type`]. A lagging
/// client skips the events it missed and keeps streaming.
///
/// # Example
/// ```rust,ignore
/// pub async fn event_stream(
///     State(state): State<AppState>,
/// ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
///     hackrev_common::sse::create_event_sse_stream("hackrev-api", state.events.subscribe())
/// }
/// ```
pub fn create_event_sse_stream(
    service_name: &'static str,
    mut rx: broadcast::Receiver<LedgerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} ledger events", service_name);

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    debug!("SSE: forwarding {}", event.event_type());
                    match Event::default().event(event.event_type()).json_data(&event) {
                        Ok(sse_event) => yield Ok(sse_event),
                        Err(e) => warn!("SSE: failed to serialize {}: {}", event.event_type(), e),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE: {} client lagged, skipped {} events", service_name, skipped);
                }
                Err(RecvError::Closed) => {
                    info!("SSE: {} event bus closed, ending stream", service_name);
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
