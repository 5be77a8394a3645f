//! Analysis orchestrator
//!
//! Owns the dashboard's [`RunState`] and the pending upload, and drives each
//! run through its stages strictly in order:
//!
//! ```text
//! classify ──► encode image (blocking pool) ──► explain ──► commit record
//! ```
//!
//! State transitions:
//! - `select_file`: any state → `Idle` (cancels an in-flight run)
//! - `start_run`: `Idle | Succeeded | Failed | Cancelled` → `Analyzing`
//!   (no-op without an upload, or while another run is analyzing)
//! - run completion: `Analyzing` → `Succeeded | Failed`
//! - `cancel`: `Analyzing` → `Cancelled`
//!
//! Only the orchestrator writes the state; everything else reads snapshots.

use chrono::Utc;
use cxr_common::events::{DashEvent, EventBus};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{
    AnalysisRecord, DashboardSnapshot, ImagePayload, PendingUpload, RunState, UploadSummary,
};
use crate::services::classifier_client::ClassifierError;
use crate::services::explanation_client::inline_image;
use crate::types::{Classifier, Explainer};

/// User-facing message when the classification service failure is surfaced
pub const CLASSIFIER_UNAVAILABLE_MESSAGE: &str =
    "Analysis failed: the classification service could not be reached. \
     Please check that the local classification service is running.";

/// User-facing message for any other failure
pub const UNEXPECTED_FAILURE_MESSAGE: &str =
    "Analysis failed unexpectedly. Please try again.";

/// Result of a `start_run` call
#[derive(Debug)]
pub enum StartOutcome {
    /// A new run is analyzing
    Started(RunHandle),
    /// No file selected; nothing changed
    NoUpload,
    /// Another run is analyzing; nothing changed
    AlreadyRunning { run_id: Uuid },
}

/// Handle to a spawned run
#[derive(Debug)]
pub struct RunHandle {
    run_id: Uuid,
    join: JoinHandle<()>,
}

impl RunHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Wait until the run has reached a terminal state (or was superseded)
    pub async fn wait(self) -> Result<(), JoinError> {
        self.join.await
    }
}

/// Why a run failed; raw detail is logged, never shown
#[derive(Debug)]
enum RunFailure {
    Classifier(ClassifierError),
    Encoding(String),
    Panicked(String),
}

impl RunFailure {
    fn user_message(&self) -> &'static str {
        match self {
            RunFailure::Classifier(ClassifierError::Unavailable(_)) => CLASSIFIER_UNAVAILABLE_MESSAGE,
            _ => UNEXPECTED_FAILURE_MESSAGE,
        }
    }

    fn detail(&self) -> String {
        match self {
            RunFailure::Classifier(e) => format!("classification: {}", e),
            RunFailure::Encoding(e) => format!("image encoding: {}", e),
            RunFailure::Panicked(e) => format!("pipeline task: {}", e),
        }
    }
}

#[derive(Debug)]
enum RunOutcome {
    Completed(AnalysisRecord),
    Failed(RunFailure),
    Cancelled,
}

struct ActiveRun {
    run_id: Uuid,
    token: CancellationToken,
}

struct Session {
    state: RunState,
    upload: Option<PendingUpload>,
    active: Option<ActiveRun>,
}

struct Inner {
    session: RwLock<Session>,
    classifier: Arc<dyn Classifier>,
    explainer: Arc<dyn Explainer>,
    event_bus: EventBus,
    last_error: RwLock<Option<String>>,
}

/// Run state machine and pipeline driver
///
/// Cloning shares the same state.
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    inner: Arc<Inner>,
}

impl AnalysisOrchestrator {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        explainer: Arc<dyn Explainer>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                session: RwLock::new(Session {
                    state: RunState::Idle,
                    upload: None,
                    active: None,
                }),
                classifier,
                explainer,
                event_bus,
                last_error: RwLock::new(None),
            }),
        }
    }

    /// Make `upload` the pending upload and reset to `Idle`
    ///
    /// The previous upload (and its preview) is dropped here. An in-flight
    /// run is cancelled and its results are discarded.
    pub async fn select_file(&self, upload: PendingUpload) -> UploadSummary {
        let summary = UploadSummary::from(&upload);
        let mut session = self.inner.session.write().await;

        if let Some(active) = session.active.take() {
            active.token.cancel();
            info!(run_id = %active.run_id, "New file selected, cancelling in-flight run");
            self.inner.event_bus.emit_lossy(DashEvent::RunCancelled {
                run_id: active.run_id,
                timestamp: Utc::now(),
            });
        }

        session.upload = Some(upload);
        session.state = RunState::Idle;
        drop(session);

        self.inner.event_bus.emit_lossy(DashEvent::UploadSelected {
            upload_id: summary.upload_id,
            file_name: summary.file_name.clone(),
            mime_type: summary.mime_type.clone(),
            size_bytes: summary.size_bytes,
            timestamp: Utc::now(),
        });

        summary
    }

    /// Start a run for the pending upload
    ///
    /// The `Analyzing` transition and the clearing of the previous result
    /// happen under one write lock, before any network call.
    pub async fn start_run(&self) -> StartOutcome {
        let mut session = self.inner.session.write().await;

        if let Some(run_id) = session.state.analyzing_run() {
            debug!(run_id = %run_id, "start_run ignored: run already analyzing");
            return StartOutcome::AlreadyRunning { run_id };
        }

        let payload = match session.upload.as_ref() {
            Some(upload) => upload.payload().clone(),
            None => {
                debug!("start_run ignored: no file selected");
                return StartOutcome::NoUpload;
            }
        };

        let run_id = Uuid::new_v4();
        let token = CancellationToken::new();
        session.state = RunState::Analyzing {
            run_id,
            started_at: Utc::now(),
        };
        session.active = Some(ActiveRun {
            run_id,
            token: token.clone(),
        });
        drop(session);

        info!(run_id = %run_id, upload_id = %payload.upload_id, "Analysis run started");
        self.inner.event_bus.emit_lossy(DashEvent::RunStarted {
            run_id,
            upload_id: payload.upload_id,
            timestamp: Utc::now(),
        });

        let inner = Arc::clone(&self.inner);
        let join = tokio::spawn(async move {
            inner.supervise(run_id, payload, token).await;
        });

        StartOutcome::Started(RunHandle { run_id, join })
    }

    /// Cancel the in-flight run, if any
    ///
    /// Returns the cancelled run id.
    pub async fn cancel(&self) -> Option<Uuid> {
        let mut session = self.inner.session.write().await;
        let active = session.active.take()?;

        active.token.cancel();
        session.state = RunState::Cancelled {
            run_id: active.run_id,
        };
        drop(session);

        info!(run_id = %active.run_id, "Analysis run cancelled");
        self.inner.event_bus.emit_lossy(DashEvent::RunCancelled {
            run_id: active.run_id,
            timestamp: Utc::now(),
        });

        Some(active.run_id)
    }

    /// Current run state
    pub async fn state(&self) -> RunState {
        self.inner.session.read().await.state.clone()
    }

    /// Current run state plus pending upload description
    pub async fn snapshot(&self) -> DashboardSnapshot {
        let session = self.inner.session.read().await;
        DashboardSnapshot {
            state: session.state.clone(),
            upload: session.upload.as_ref().map(UploadSummary::from),
        }
    }

    /// Raw detail of the most recent failed run, for diagnostics
    pub async fn last_error(&self) -> Option<String> {
        self.inner.last_error.read().await.clone()
    }
}

impl Inner {
    /// Run the pipeline on its own task so a panic becomes `Failed`
    async fn supervise(self: Arc<Self>, run_id: Uuid, payload: ImagePayload, token: CancellationToken) {
        let pipeline = tokio::spawn(Arc::clone(&self).execute_pipeline(run_id, payload, token));

        let outcome = match pipeline.await {
            Ok(outcome) => outcome,
            Err(join_error) => RunOutcome::Failed(RunFailure::Panicked(join_error.to_string())),
        };

        self.finish(run_id, outcome).await;
    }

    async fn execute_pipeline(
        self: Arc<Self>,
        run_id: Uuid,
        payload: ImagePayload,
        token: CancellationToken,
    ) -> RunOutcome {
        // Stage 1: classification (remote or simulated)
        let classification = tokio::select! {
            biased;
            _ = token.cancelled() => return RunOutcome::Cancelled,
            result = self.classifier.classify(&payload) => result,
        };
        let classification = match classification {
            Ok(classification) => classification,
            Err(e) => return RunOutcome::Failed(RunFailure::Classifier(e)),
        };

        debug!(
            run_id = %run_id,
            label = %classification.label(),
            confidence = classification.confidence(),
            is_simulated = classification.is_simulated(),
            "Classification stage complete"
        );
        self.event_bus.emit_lossy(DashEvent::ClassificationCompleted {
            run_id,
            label: classification.label(),
            confidence: classification.confidence(),
            is_simulated: classification.is_simulated(),
            timestamp: Utc::now(),
        });

        // Stage 2: encode image for inline attachment
        let encode_source = payload.clone();
        let encoded = tokio::select! {
            biased;
            _ = token.cancelled() => return RunOutcome::Cancelled,
            joined = tokio::task::spawn_blocking(move || inline_image(&encode_source)) => joined,
        };
        let image = match encoded {
            Ok(image) => image,
            Err(e) => return RunOutcome::Failed(RunFailure::Encoding(e.to_string())),
        };

        // Stage 3: explanation (never fails; fallback text on error)
        let explanation = tokio::select! {
            biased;
            _ = token.cancelled() => return RunOutcome::Cancelled,
            text = self.explainer.explain(
                classification.label(),
                classification.confidence(),
                Some(&image),
            ) => text,
        };

        RunOutcome::Completed(AnalysisRecord::complete(run_id, classification, explanation))
    }

    /// Commit a run outcome if the run is still the current one
    async fn finish(&self, run_id: Uuid, outcome: RunOutcome) {
        let mut session = self.session.write().await;

        let is_current = session.active.as_ref().map(|a| a.run_id) == Some(run_id)
            && session.state.analyzing_run() == Some(run_id);
        if !is_current {
            debug!(run_id = %run_id, "Discarding outcome of superseded run");
            return;
        }
        session.active = None;

        match outcome {
            RunOutcome::Completed(record) => {
                info!(
                    run_id = %run_id,
                    label = %record.label(),
                    confidence = record.confidence(),
                    is_simulated = record.is_simulated(),
                    "Analysis run succeeded"
                );
                let event = DashEvent::RunSucceeded {
                    run_id,
                    label: record.label(),
                    confidence: record.confidence(),
                    is_simulated: record.is_simulated(),
                    timestamp: record.timestamp(),
                };
                session.state = RunState::Succeeded(record);
                drop(session);
                self.event_bus.emit_lossy(event);
            }
            RunOutcome::Failed(failure) => {
                let detail = failure.detail();
                error!(run_id = %run_id, error = %detail, "Analysis run failed");

                let message = failure.user_message().to_string();
                session.state = RunState::Failed {
                    run_id,
                    message: message.clone(),
                };
                drop(session);

                *self.last_error.write().await = Some(detail);
                self.event_bus.emit_lossy(DashEvent::RunFailed {
                    run_id,
                    message,
                    timestamp: Utc::now(),
                });
            }
            RunOutcome::Cancelled => {
                warn!(run_id = %run_id, "Run observed cancellation without a cancel request");
                session.state = RunState::Cancelled { run_id };
                drop(session);
                self.event_bus.emit_lossy(DashEvent::RunCancelled {
                    run_id,
                    timestamp: Utc::now(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassificationLabel, ClassificationResult};
    use crate::services::preview_store::PreviewStore;
    use crate::types::InlineImage;
    use axum::body::Bytes;

    struct FixedClassifier(ClassificationResult);

    #[async_trait::async_trait]
    impl Classifier for FixedClassifier {
        async fn classify(&self, _image: &ImagePayload) -> Result<ClassificationResult, ClassifierError> {
            Ok(self.0)
        }
    }

    struct EchoExplainer;

    #[async_trait::async_trait]
    impl Explainer for EchoExplainer {
        async fn explain(
            &self,
            label: ClassificationLabel,
            confidence: f64,
            image: Option<&InlineImage>,
        ) -> String {
            format!("{} {:.0} {}", label, confidence, image.is_some())
        }
    }

    fn upload(store: &PreviewStore) -> PendingUpload {
        let upload_id = Uuid::new_v4();
        let bytes = Bytes::from_static(b"image-bytes");
        let preview = store.acquire(upload_id, "image/png".to_string(), bytes.clone());
        PendingUpload::new(
            ImagePayload {
                upload_id,
                file_name: "scan.png".to_string(),
                mime_type: "image/png".to_string(),
                bytes,
            },
            preview,
        )
    }

    fn orchestrator() -> AnalysisOrchestrator {
        let result =
            ClassificationResult::from_probability(ClassificationLabel::Pneumonia, 0.91).unwrap();
        AnalysisOrchestrator::new(
            Arc::new(FixedClassifier(result)),
            Arc::new(EchoExplainer),
            EventBus::new(16),
        )
    }

    #[tokio::test]
    async fn test_start_without_upload_is_noop() {
        let orchestrator = orchestrator();
        assert!(matches!(orchestrator.start_run().await, StartOutcome::NoUpload));
        assert_eq!(orchestrator.state().await, RunState::Idle);
    }

    #[tokio::test]
    async fn test_run_reaches_succeeded() {
        let store = PreviewStore::new();
        let orchestrator = orchestrator();
        orchestrator.select_file(upload(&store)).await;

        let handle = match orchestrator.start_run().await {
            StartOutcome::Started(handle) => handle,
            other => panic!("expected Started, got {:?}", other),
        };
        let run_id = handle.run_id();
        handle.wait().await.unwrap();

        let state = orchestrator.state().await;
        let record = state.record().expect("record");
        assert_eq!(record.run_id(), run_id);
        assert_eq!(record.label(), ClassificationLabel::Pneumonia);
        assert!((record.confidence() - 91.0).abs() < 1e-9);
        assert_eq!(record.explanation(), "Pneumonia 91 true");
        assert!(!record.is_simulated());
    }

    #[tokio::test]
    async fn test_select_file_releases_previous_preview() {
        let store = PreviewStore::new();
        let orchestrator = orchestrator();

        let first = orchestrator.select_file(upload(&store)).await;
        let second = orchestrator.select_file(upload(&store)).await;

        assert_eq!(store.active_count(), 1);
        assert!(store.get(first.upload_id).is_none());
        assert!(store.get(second.upload_id).is_some());

        let snapshot = orchestrator.snapshot().await;
        assert_eq!(snapshot.upload.unwrap().upload_id, second.upload_id);
    }

    #[tokio::test]
    async fn test_cancel_without_run_is_noop() {
        let orchestrator = orchestrator();
        assert_eq!(orchestrator.cancel().await, None);
        assert_eq!(orchestrator.state().await, RunState::Idle);
    }
}
