//! Server-Sent Events (SSE) utilities
//!
//! Shared SSE implementation for CXR services: forwards EventBus traffic to a
//! browser with a periodic heartbeat comment.

use crate::events::EventBus;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Heartbeat interval for all SSE streams
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Create an SSE stream that forwards every event on `event_bus`
///
/// The first frame is a `ConnectionStatus` event with data `connected` so the
/// page can show its connection indicator immediately.
///
/// # Example
/// ```rust,ignore
/// pub async fn event_stream(
///     State(state): State<AppState>,
/// ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
///     cxr_common::sse::create_event_sse_stream("cxr-dash", &state.event_bus)
/// }
/// ```
pub fn create_event_sse_stream(
    service_name: &'static str,
    event_bus: &EventBus,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} events", service_name);

    let mut rx = event_bus.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    let event_type = event.event_type().to_string();
                    match serde_json::to_string(&event) {
                        Ok(event_json) => {
                            debug!("SSE: Broadcasting event: {}", event_type);
                            yield Ok(Event::default()
                                .event(event_type)
                                .data(event_json));
                        }
                        Err(e) => {
                            warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Client will resync from the snapshot endpoint
                    warn!("SSE: {} client lagged, skipped {} events", service_name, skipped);
                    yield Ok(Event::default().event("Resync").data(skipped.to_string()));
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
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
