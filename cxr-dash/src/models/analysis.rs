//! Analysis record and run state machine
//!
//! `Idle → Analyzing → Succeeded | Failed | Cancelled`; selecting a new file
//! returns to `Idle` from any state.

use chrono::{DateTime, Utc};
use cxr_common::events::ClassificationLabel;
use serde::Serialize;
use uuid::Uuid;

use super::classification::ClassificationResult;
use super::upload::PendingUpload;

/// Result of one completed run
///
/// Created once when the run completes and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    run_id: Uuid,
    label: ClassificationLabel,
    /// Percentage, 0-100
    confidence: f64,
    timestamp: DateTime<Utc>,
    explanation: String,
    is_simulated: bool,
}

impl AnalysisRecord {
    /// Assemble the record at completion time
    ///
    /// `is_simulated` comes from the classification stage only.
    pub fn complete(run_id: Uuid, classification: ClassificationResult, explanation: String) -> Self {
        Self {
            run_id,
            label: classification.label(),
            confidence: classification.confidence(),
            timestamp: Utc::now(),
            explanation,
            is_simulated: classification.is_simulated(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn label(&self) -> ClassificationLabel {
        self.label
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn is_simulated(&self) -> bool {
        self.is_simulated
    }
}

/// Single source of truth for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Analyzing {
        run_id: Uuid,
        started_at: DateTime<Utc>,
    },
    Succeeded(AnalysisRecord),
    Failed {
        run_id: Uuid,
        /// Sanitized, safe to show to the user
        message: String,
    },
    Cancelled {
        run_id: Uuid,
    },
}

impl RunState {
    pub fn is_analyzing(&self) -> bool {
        matches!(self, RunState::Analyzing { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Succeeded(_) | RunState::Failed { .. } | RunState::Cancelled { .. }
        )
    }

    /// Run currently in flight, if any
    pub fn analyzing_run(&self) -> Option<Uuid> {
        match self {
            RunState::Analyzing { run_id, .. } => Some(*run_id),
            _ => None,
        }
    }

    pub fn record(&self) -> Option<&AnalysisRecord> {
        match self {
            RunState::Succeeded(record) => Some(record),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            RunState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Description of the pending upload for clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadSummary {
    pub upload_id: Uuid,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub preview_url: String,
}

impl From<&PendingUpload> for UploadSummary {
    fn from(upload: &PendingUpload) -> Self {
        let payload = upload.payload();
        Self {
            upload_id: payload.upload_id,
            file_name: payload.file_name.clone(),
            mime_type: payload.mime_type.clone(),
            size_bytes: upload.size_bytes(),
            preview_url: upload.preview_url(),
        }
    }
}

/// Read-only view of the orchestrator state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub state: RunState,
    pub upload: Option<UploadSummary>,
}
