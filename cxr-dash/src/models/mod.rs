//! Data models for cxr-dash
//!
//! - Classification result with normalized confidence
//! - Analysis record and run state machine
//! - Pending upload with scoped preview handle

pub mod analysis;
pub mod classification;
pub mod upload;

pub use analysis::{AnalysisRecord, DashboardSnapshot, RunState, UploadSummary};
pub use classification::{ClassificationResult, ConfidenceError};
pub use cxr_common::events::ClassificationLabel;
pub use upload::{ImagePayload, PendingUpload};
