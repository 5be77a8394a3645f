//! Classification service client
//!
//! `POST {classifier_url}/predict` with a multipart `image` field. The
//! response carries a probability in 0.0-1.0 which is normalized to a
//! percentage here, before any [`ClassificationResult`] exists.
//!
//! Any failure (timeout, connection refused, non-2xx, malformed body) is
//! handed to the configured [`FallbackPolicy`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ClassifierConfig, FallbackPolicy};
use crate::models::{ClassificationLabel, ClassificationResult, ImagePayload};
use crate::services::simulator::LocalSimulator;
use crate::types::Classifier;

const USER_AGENT: &str = concat!("cxr-dash/", env!("CARGO_PKG_VERSION"));

/// Classification client errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classification request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Classification service responded with status {0}")]
    Status(u16),

    #[error("Malformed classification response: {0}")]
    Malformed(String),

    /// Failure surfaced to the caller under [`FallbackPolicy::Surface`]
    #[error("Classification service unavailable: {0}")]
    Unavailable(String),
}

/// `/predict` response body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PredictResponse {
    pub prediction: String,
    /// Probability, 0.0-1.0
    pub confidence: f64,
}

impl PredictResponse {
    /// Validate and normalize into a classification result
    pub fn into_result(self) -> Result<ClassificationResult, ClassifierError> {
        let label: ClassificationLabel = self
            .prediction
            .parse()
            .map_err(|e| ClassifierError::Malformed(format!("{}", e)))?;

        ClassificationResult::from_probability(label, self.confidence)
            .map_err(|e| ClassifierError::Malformed(e.to_string()))
    }
}

/// HTTP classification client with fallback policy
pub struct HttpClassifier {
    http_client: reqwest::Client,
    predict_url: String,
    timeout: Duration,
    fallback_policy: FallbackPolicy,
    simulator: LocalSimulator,
}

impl HttpClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            predict_url: config.predict_url(),
            timeout: config.timeout,
            fallback_policy: config.fallback_policy,
            simulator: LocalSimulator::new(config.simulation_delay),
        })
    }

    pub fn fallback_policy(&self) -> FallbackPolicy {
        self.fallback_policy
    }

    /// One request to the classification service, no fallback
    pub async fn request_prediction(
        &self,
        image: &ImagePayload,
    ) -> Result<ClassificationResult, ClassifierError> {
        let part = reqwest::multipart::Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(|e| ClassifierError::Network(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        debug!(
            upload_id = %image.upload_id,
            url = %self.predict_url,
            size_bytes = image.bytes.len(),
            "Requesting classification"
        );

        let response = self
            .http_client
            .post(&self.predict_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifierError::Status(status.as_u16()));
        }

        let body: PredictResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ClassifierError::Timeout(self.timeout)
            } else {
                ClassifierError::Malformed(e.to_string())
            }
        })?;

        let result = body.into_result()?;
        info!(
            upload_id = %image.upload_id,
            label = %result.label(),
            confidence = result.confidence(),
            "Classification service responded"
        );
        Ok(result)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ClassifierError {
        if e.is_timeout() {
            ClassifierError::Timeout(self.timeout)
        } else {
            ClassifierError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, image: &ImagePayload) -> Result<ClassificationResult, ClassifierError> {
        let error = match self.request_prediction(image).await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        match self.fallback_policy {
            FallbackPolicy::Simulate => {
                warn!(
                    upload_id = %image.upload_id,
                    error = %error,
                    "Classification service unreachable, falling back to simulation"
                );
                Ok(self.simulator.simulate().await)
            }
            FallbackPolicy::Surface => {
                warn!(
                    upload_id = %image.upload_id,
                    error = %error,
                    "Classification service unreachable, surfacing failure"
                );
                Err(ClassifierError::Unavailable(error.to_string()))
            }
        }
    }
}
