//! Instrumented pipeline stages
//!
//! Record every call into a shared [`CallLog`] so tests can assert ordering,
//! and optionally block on a gate to hold a run in `Analyzing`.

use cxr_dash::models::{ClassificationLabel, ClassificationResult, ImagePayload};
use cxr_dash::services::ClassifierError;
use cxr_dash::types::{Classifier, Explainer, InlineImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Shared, ordered record of stage calls
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

#[derive(Debug, Clone)]
pub enum ClassifyBehavior {
    Return(ClassificationResult),
    Surface,
    Panic,
}

pub struct ScriptedClassifier {
    log: CallLog,
    behavior: ClassifyBehavior,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new(log: CallLog, behavior: ClassifyBehavior) -> Self {
        Self {
            log,
            behavior,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn pneumonia(log: CallLog) -> Self {
        let result = ClassificationResult::from_probability(ClassificationLabel::Pneumonia, 0.91)
            .expect("valid probability");
        Self::new(log, ClassifyBehavior::Return(result))
    }

    /// Block each call until `gate` is notified
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, _image: &ImagePayload) -> Result<ClassificationResult, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.push("classify:start");

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let outcome = match &self.behavior {
            ClassifyBehavior::Return(result) => Ok(*result),
            ClassifyBehavior::Surface => {
                Err(ClassifierError::Unavailable("connection refused".to_string()))
            }
            ClassifyBehavior::Panic => panic!("classifier exploded"),
        };

        self.log.push("classify:end");
        outcome
    }
}

pub struct ScriptedExplainer {
    log: CallLog,
    text: String,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl ScriptedExplainer {
    pub fn new(log: CallLog, text: impl Into<String>) -> Self {
        Self {
            log,
            text: text.into(),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Explainer for ScriptedExplainer {
    async fn explain(
        &self,
        label: ClassificationLabel,
        _confidence: f64,
        image: Option<&InlineImage>,
    ) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.push("explain:start");
        self.log.push(format!("explain:label={}", label));
        if image.is_some() {
            self.log.push("explain:image");
        }

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.log.push("explain:end");
        self.text.clone()
    }
}
