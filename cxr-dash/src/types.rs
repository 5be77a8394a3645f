//! Pipeline stage traits
//!
//! The orchestrator drives two remote stages through these traits:
//! - **Classifier:** image → label + confidence (may degrade to simulation)
//! - **Explainer:** label + confidence + optional image → report text
//!
//! Production implementations live in `services`; tests substitute
//! instrumented stubs.

use cxr_common::events::ClassificationLabel;

use crate::models::{ClassificationResult, ImagePayload};
use crate::services::classifier_client::ClassifierError;

/// Base64-encoded image attached to the explanation request
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Standard base64 alphabet, padded
    pub data: String,
}

/// Classification stage
///
/// # Example
/// ```rust,ignore
/// struct AlwaysNormal;
///
/// #[async_trait::async_trait]
/// impl Classifier for AlwaysNormal {
///     async fn classify(&self, _image: &ImagePayload) -> Result<ClassificationResult, ClassifierError> {
///         Ok(ClassificationResult::new(ClassificationLabel::Normal, 99.0, false).unwrap())
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    /// Classify an image
    ///
    /// # Errors
    /// Only when the configured fallback policy surfaces failures; under the
    /// simulate policy every failure yields a simulated result instead.
    async fn classify(&self, image: &ImagePayload) -> Result<ClassificationResult, ClassifierError>;
}

/// Explanation stage
///
/// Infallible by contract: failures are reported as fallback text so a
/// classification already obtained is never discarded.
#[async_trait::async_trait]
pub trait Explainer: Send + Sync {
    async fn explain(
        &self,
        label: ClassificationLabel,
        confidence: f64,
        image: Option<&InlineImage>,
    ) -> String;
}
