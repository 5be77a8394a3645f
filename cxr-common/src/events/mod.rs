//! Event types for the CXR event system
//!
//! Provides shared event definitions and the EventBus used to fan events out
//! to SSE clients.

mod analysis_types;

pub use analysis_types::{ClassificationLabel, UnknownLabel};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Dashboard event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// The `type` tag matches `event_type()` so browser listeners can bind by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DashEvent {
    /// A new image was accepted and is now the pending upload
    ///
    /// Any previous result or error has been cleared.
    UploadSelected {
        upload_id: Uuid,
        file_name: String,
        mime_type: String,
        size_bytes: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A run left Idle/terminal and entered Analyzing
    RunStarted {
        run_id: Uuid,
        upload_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Classification stage produced a result (remote or simulated)
    ///
    /// The explanation stage starts after this event.
    ClassificationCompleted {
        run_id: Uuid,
        label: ClassificationLabel,
        /// Percentage, 0-100
        confidence: f64,
        is_simulated: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Run finished with a complete analysis record
    RunSucceeded {
        run_id: Uuid,
        label: ClassificationLabel,
        confidence: f64,
        is_simulated: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Run finished with a sanitized error message
    RunFailed {
        run_id: Uuid,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Run was interrupted by a new upload or an explicit cancel
    RunCancelled {
        run_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl DashEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            DashEvent::UploadSelected { .. } => "UploadSelected",
            DashEvent::RunStarted { .. } => "RunStarted",
            DashEvent::ClassificationCompleted { .. } => "ClassificationCompleted",
            DashEvent::RunSucceeded { .. } => "RunSucceeded",
            DashEvent::RunFailed { .. } => "RunFailed",
            DashEvent::RunCancelled { .. } => "RunCancelled",
        }
    }

    /// Run this event belongs to, if any
    pub fn run_id(&self) -> Option<Uuid> {
        match self {
            DashEvent::UploadSelected { .. } => None,
            DashEvent::RunStarted { run_id, .. }
            | DashEvent::ClassificationCompleted { run_id, .. }
            | DashEvent::RunSucceeded { run_id, .. }
            | DashEvent::RunFailed { run_id, .. }
            | DashEvent::RunCancelled { run_id, .. } => Some(*run_id),
        }
    }
}

/// Broadcast bus for dashboard events
///
/// Cloning is cheap; all clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DashEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers drop old events
    ///
    /// # Examples
    ///
    /// ```
    /// use cxr_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// let _rx = event_bus.subscribe();
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<DashEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: DashEvent,
    ) -> Result<usize, broadcast::error::SendError<DashEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Dashboard events are advisory: the authoritative state is always
    /// available from the snapshot endpoint.
    pub fn emit_lossy(&self, event: DashEvent) {
        let _ = self.tx.send(event);
    }
}
