//! Server-Sent Events for run progress
//!
//! Streams UploadSelected, RunStarted, ClassificationCompleted, RunSucceeded,
//! RunFailed and RunCancelled. Clients re-read `/api/analysis` after a
//! `Resync` event.

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /api/events
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    cxr_common::sse::create_event_sse_stream("cxr-dash", &state.event_bus)
}
