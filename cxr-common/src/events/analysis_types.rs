//! Analysis-related types shared between event payloads and services

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Binary chest X-ray classification label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassificationLabel {
    Normal,
    Pneumonia,
}

impl ClassificationLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationLabel::Normal => "Normal",
            ClassificationLabel::Pneumonia => "Pneumonia",
        }
    }
}

impl fmt::Display for ClassificationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for label strings that are neither label
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown classification label: {0}")]
pub struct UnknownLabel(pub String);

impl FromStr for ClassificationLabel {
    type Err = UnknownLabel;

    /// Case-insensitive; the classifier has been seen sending both
    /// "Pneumonia" and "PNEUMONIA".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(ClassificationLabel::Normal),
            "pneumonia" => Ok(ClassificationLabel::Pneumonia),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}
