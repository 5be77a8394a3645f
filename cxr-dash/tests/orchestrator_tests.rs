//! Orchestrator state machine tests
//!
//! Use scripted pipeline stages to pin down stage ordering, overlap
//! rejection, cancellation, and the events emitted per run.

mod helpers;

use cxr_common::events::{DashEvent, EventBus};
use cxr_dash::models::{ClassificationLabel, ClassificationResult, RunState};
use cxr_dash::services::orchestrator::{CLASSIFIER_UNAVAILABLE_MESSAGE, UNEXPECTED_FAILURE_MESSAGE};
use cxr_dash::services::{AnalysisOrchestrator, PreviewStore, RunHandle, StartOutcome};
use helpers::{png_upload, CallLog, ClassifyBehavior, ScriptedClassifier, ScriptedExplainer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

const REPORT: &str = "report text";

struct Fixture {
    orchestrator: AnalysisOrchestrator,
    classifier: Arc<ScriptedClassifier>,
    explainer: Arc<ScriptedExplainer>,
    previews: PreviewStore,
    log: CallLog,
    event_bus: EventBus,
}

fn fixture_with(classifier: ScriptedClassifier, explainer: ScriptedExplainer, log: CallLog) -> Fixture {
    let classifier = Arc::new(classifier);
    let explainer = Arc::new(explainer);
    let event_bus = EventBus::new(64);
    let orchestrator =
        AnalysisOrchestrator::new(classifier.clone(), explainer.clone(), event_bus.clone());

    Fixture {
        orchestrator,
        classifier,
        explainer,
        previews: PreviewStore::new(),
        log,
        event_bus,
    }
}

fn fixture() -> Fixture {
    let log = CallLog::default();
    fixture_with(
        ScriptedClassifier::pneumonia(log.clone()),
        ScriptedExplainer::new(log.clone(), REPORT),
        log,
    )
}

fn started(outcome: StartOutcome) -> RunHandle {
    match outcome {
        StartOutcome::Started(handle) => handle,
        other => panic!("expected Started, got {:?}", other),
    }
}

async fn finish(handle: RunHandle) {
    tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("run should not hang")
        .expect("run task");
}

/// Yield until the classifier has been entered
async fn wait_for_classify(log: &CallLog) {
    for _ in 0..200 {
        if log.position("classify:start").is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("classifier was never called");
}

#[tokio::test]
async fn test_explain_runs_after_classify_completes() {
    let f = fixture();
    f.orchestrator.select_file(png_upload(&f.previews)).await;

    finish(started(f.orchestrator.start_run().await)).await;

    let classify_end = f.log.position("classify:end").expect("classify finished");
    let explain_start = f.log.position("explain:start").expect("explain started");
    assert!(classify_end < explain_start, "log: {:?}", f.log.entries());

    // Explanation sees the classifier's label and the encoded image
    assert!(f.log.position("explain:label=Pneumonia").is_some());
    assert!(f.log.position("explain:image").is_some());

    let state = f.orchestrator.state().await;
    let record = state.record().expect("Succeeded");
    assert_eq!(record.label(), ClassificationLabel::Pneumonia);
    assert_eq!(record.explanation(), REPORT);
}

#[tokio::test]
async fn test_second_start_while_analyzing_is_rejected() {
    let log = CallLog::default();
    let gate = Arc::new(Notify::new());
    let f = fixture_with(
        ScriptedClassifier::pneumonia(log.clone()).gated(gate.clone()),
        ScriptedExplainer::new(log.clone(), REPORT),
        log,
    );
    f.orchestrator.select_file(png_upload(&f.previews)).await;

    let handle = started(f.orchestrator.start_run().await);
    let run_id = handle.run_id();
    wait_for_classify(&f.log).await;

    match f.orchestrator.start_run().await {
        StartOutcome::AlreadyRunning { run_id: running } => assert_eq!(running, run_id),
        other => panic!("expected AlreadyRunning, got {:?}", other),
    }
    assert_eq!(f.orchestrator.state().await.analyzing_run(), Some(run_id));

    gate.notify_one();
    finish(handle).await;

    assert_eq!(f.classifier.calls(), 1);
    assert_eq!(f.explainer.calls(), 1);
    assert_eq!(f.orchestrator.state().await.record().unwrap().run_id(), run_id);
}

#[tokio::test]
async fn test_start_clears_previous_result() {
    let log = CallLog::default();
    let gate = Arc::new(Notify::new());
    let f = fixture_with(
        ScriptedClassifier::pneumonia(log.clone()),
        ScriptedExplainer::new(log.clone(), REPORT).gated(gate.clone()),
        log,
    );
    f.orchestrator.select_file(png_upload(&f.previews)).await;

    gate.notify_one();
    finish(started(f.orchestrator.start_run().await)).await;
    assert!(f.orchestrator.state().await.record().is_some());

    let handle = started(f.orchestrator.start_run().await);
    let state = f.orchestrator.state().await;
    assert!(state.is_analyzing());
    assert!(state.record().is_none());

    gate.notify_one();
    finish(handle).await;
    assert!(f.orchestrator.state().await.record().is_some());
}

#[tokio::test]
async fn test_select_file_resets_terminal_state_to_idle() {
    let f = fixture();
    f.orchestrator.select_file(png_upload(&f.previews)).await;
    finish(started(f.orchestrator.start_run().await)).await;
    assert!(f.orchestrator.state().await.is_terminal());

    let summary = f.orchestrator.select_file(png_upload(&f.previews)).await;

    let snapshot = f.orchestrator.snapshot().await;
    assert_eq!(snapshot.state, RunState::Idle);
    assert_eq!(snapshot.upload.unwrap().upload_id, summary.upload_id);
    assert_eq!(f.previews.active_count(), 1);
}

#[tokio::test]
async fn test_select_file_resets_failed_state_to_idle() {
    let log = CallLog::default();
    let f = fixture_with(
        ScriptedClassifier::new(log.clone(), ClassifyBehavior::Surface),
        ScriptedExplainer::new(log.clone(), REPORT),
        log,
    );
    f.orchestrator.select_file(png_upload(&f.previews)).await;
    finish(started(f.orchestrator.start_run().await)).await;

    let state = f.orchestrator.state().await;
    assert_eq!(state.error_message(), Some(CLASSIFIER_UNAVAILABLE_MESSAGE));
    assert_eq!(f.explainer.calls(), 0);

    f.orchestrator.select_file(png_upload(&f.previews)).await;
    assert_eq!(f.orchestrator.state().await, RunState::Idle);
}

#[tokio::test]
async fn test_select_file_mid_run_discards_result() {
    let log = CallLog::default();
    let gate = Arc::new(Notify::new());
    let f = fixture_with(
        ScriptedClassifier::pneumonia(log.clone()).gated(gate.clone()),
        ScriptedExplainer::new(log.clone(), REPORT),
        log,
    );
    f.orchestrator.select_file(png_upload(&f.previews)).await;
    let handle = started(f.orchestrator.start_run().await);
    wait_for_classify(&f.log).await;

    f.orchestrator.select_file(png_upload(&f.previews)).await;
    gate.notify_one();
    finish(handle).await;

    assert_eq!(f.orchestrator.state().await, RunState::Idle);
    assert_eq!(f.explainer.calls(), 0);
}

#[tokio::test]
async fn test_cancel_stops_run_before_explanation() {
    let log = CallLog::default();
    let gate = Arc::new(Notify::new());
    let f = fixture_with(
        ScriptedClassifier::pneumonia(log.clone()).gated(gate.clone()),
        ScriptedExplainer::new(log.clone(), REPORT),
        log,
    );
    f.orchestrator.select_file(png_upload(&f.previews)).await;
    let handle = started(f.orchestrator.start_run().await);
    let run_id = handle.run_id();
    wait_for_classify(&f.log).await;

    assert_eq!(f.orchestrator.cancel().await, Some(run_id));
    finish(handle).await;

    assert_eq!(f.orchestrator.state().await, RunState::Cancelled { run_id });
    assert_eq!(f.explainer.calls(), 0);
    assert!(f.log.position("classify:end").is_none());

    // A new run may start after cancellation
    gate.notify_one();
    finish(started(f.orchestrator.start_run().await)).await;
    assert!(f.orchestrator.state().await.record().is_some());
}

#[tokio::test]
async fn test_panicking_stage_fails_run() {
    let log = CallLog::default();
    let f = fixture_with(
        ScriptedClassifier::new(log.clone(), ClassifyBehavior::Panic),
        ScriptedExplainer::new(log.clone(), REPORT),
        log,
    );
    f.orchestrator.select_file(png_upload(&f.previews)).await;
    finish(started(f.orchestrator.start_run().await)).await;

    let state = f.orchestrator.state().await;
    assert_eq!(state.error_message(), Some(UNEXPECTED_FAILURE_MESSAGE));
    assert!(!state.is_analyzing());

    let detail = f.orchestrator.last_error().await.expect("detail recorded");
    assert!(detail.starts_with("pipeline task:"));
}

#[tokio::test]
async fn test_simulated_flag_carries_into_record() {
    let log = CallLog::default();
    let result = ClassificationResult::new(ClassificationLabel::Normal, 88.5, true).unwrap();
    let f = fixture_with(
        ScriptedClassifier::new(log.clone(), ClassifyBehavior::Return(result)),
        ScriptedExplainer::new(log.clone(), REPORT),
        log,
    );
    f.orchestrator.select_file(png_upload(&f.previews)).await;
    finish(started(f.orchestrator.start_run().await)).await;

    let state = f.orchestrator.state().await;
    let record = state.record().unwrap();
    assert!(record.is_simulated());
    assert_eq!(record.confidence(), 88.5);
}

#[tokio::test]
async fn test_run_emits_events_in_order() {
    let f = fixture();
    let mut rx = f.event_bus.subscribe();

    let summary = f.orchestrator.select_file(png_upload(&f.previews)).await;
    let handle = started(f.orchestrator.start_run().await);
    let run_id = handle.run_id();
    finish(handle).await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    let kinds: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
    assert_eq!(
        kinds,
        vec!["UploadSelected", "RunStarted", "ClassificationCompleted", "RunSucceeded"]
    );

    match &events[0] {
        DashEvent::UploadSelected { upload_id, .. } => assert_eq!(*upload_id, summary.upload_id),
        other => panic!("unexpected event {:?}", other),
    }
    for event in &events[1..] {
        assert_eq!(event.run_id(), Some(run_id));
    }
}
