//! Classification result
//!
//! Confidence is always a percentage (0-100). Wire values from the
//! classification service are probabilities (0-1) and go through
//! [`ClassificationResult::from_probability`].

use cxr_common::events::ClassificationLabel;
use serde::Serialize;
use thiserror::Error;

/// Confidence value that cannot be represented as a percentage
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfidenceError {
    #[error("confidence is not a finite number: {0}")]
    NotFinite(f64),

    #[error("probability {0} outside 0.0-1.0")]
    ProbabilityOutOfRange(f64),

    #[error("percentage {0} outside 0-100")]
    PercentageOutOfRange(f64),
}

/// Outcome of the classification stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationResult {
    label: ClassificationLabel,
    confidence: f64,
    is_simulated: bool,
}

impl ClassificationResult {
    /// Build from a percentage confidence
    pub fn new(
        label: ClassificationLabel,
        confidence: f64,
        is_simulated: bool,
    ) -> Result<Self, ConfidenceError> {
        if !confidence.is_finite() {
            return Err(ConfidenceError::NotFinite(confidence));
        }
        if !(0.0..=100.0).contains(&confidence) {
            return Err(ConfidenceError::PercentageOutOfRange(confidence));
        }

        Ok(Self {
            label,
            confidence,
            is_simulated,
        })
    }

    /// Build from a remote probability in 0.0-1.0
    pub fn from_probability(
        label: ClassificationLabel,
        probability: f64,
    ) -> Result<Self, ConfidenceError> {
        if !probability.is_finite() {
            return Err(ConfidenceError::NotFinite(probability));
        }
        if !(0.0..=1.0).contains(&probability) {
            return Err(ConfidenceError::ProbabilityOutOfRange(probability));
        }

        Self::new(label, probability * 100.0, false)
    }

    /// Simulated result; confidence is clamped into range
    pub(crate) fn simulated(label: ClassificationLabel, confidence: f64) -> Self {
        Self {
            label,
            confidence: confidence.clamp(0.0, 100.0),
            is_simulated: true,
        }
    }

    pub fn label(&self) -> ClassificationLabel {
        self.label
    }

    /// Percentage, 0-100
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn is_simulated(&self) -> bool {
        self.is_simulated
    }
}
