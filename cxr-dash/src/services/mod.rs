//! Service modules for the result-acquisition pipeline
//!
//! - Intake and preview ownership for uploads
//! - Classification client with simulation fallback
//! - Explanation client and prompt rendering
//! - Orchestrator driving the run state machine

pub mod classifier_client;
pub mod explanation_client;
pub mod intake;
pub mod orchestrator;
pub mod preview_store;
pub mod prompt;
pub mod simulator;

pub use classifier_client::{ClassifierError, HttpClassifier, PredictResponse};
pub use explanation_client::{
    GenerativeExplainer, EMPTY_REPORT_FALLBACK, REPORT_ERROR_FALLBACK,
};
pub use intake::{ImageIntake, IntakeError};
pub use orchestrator::{AnalysisOrchestrator, RunHandle, StartOutcome};
pub use preview_store::{PreviewHandle, PreviewStore};
pub use simulator::LocalSimulator;
