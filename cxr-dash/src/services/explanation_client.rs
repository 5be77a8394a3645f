//! Generative explanation client
//!
//! Sends the classification outcome (and the image, when available) to a
//! `generateContent`-style endpoint and returns the report text. This stage
//! never fails: every error path returns one of the fixed fallback strings,
//! because the classification already obtained must still reach the user.

use async_trait::async_trait;
use base64::Engine as _;
use cxr_common::events::ClassificationLabel;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::ExplanationConfig;
use crate::models::ImagePayload;
use crate::services::prompt::render_prompt;
use crate::types::{Explainer, InlineImage};

/// Returned when the service answers but produces no text
pub const EMPTY_REPORT_FALLBACK: &str =
    "Report generation failed. Please consult a professional.";

/// Returned on transport, HTTP, parse, or credential failures
pub const REPORT_ERROR_FALLBACK: &str =
    "Error generating AI clinical explanation. Please check your connectivity.";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Internal explanation errors; never leave this module
#[derive(Debug, Error)]
pub enum ExplanationError {
    #[error("No API key configured")]
    MissingApiKey,

    #[error("Explanation request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty completion")]
    Empty,
}

// ----------------------------------------------------------------------------
// Wire format
// ----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
pub struct GenerationConfig {
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate, trimmed
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect();

        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Base64-encode an upload for the explanation request
pub fn inline_image(payload: &ImagePayload) -> InlineImage {
    InlineImage {
        mime_type: payload.mime_type.clone(),
        data: base64::engine::general_purpose::STANDARD.encode(&payload.bytes),
    }
}

/// Build the request body for one report
pub fn build_request(
    prompt: String,
    image: Option<&InlineImage>,
    temperature: f32,
) -> GenerateContentRequest {
    let mut parts = Vec::with_capacity(2);
    if let Some(image) = image {
        parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            },
        });
    }
    parts.push(Part::Text { text: prompt });

    GenerateContentRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig { temperature },
    }
}

/// Explanation client for a `generateContent` endpoint
pub struct GenerativeExplainer {
    http_client: reqwest::Client,
    config: ExplanationConfig,
}

impl GenerativeExplainer {
    pub fn new(config: ExplanationConfig) -> Result<Self, ExplanationError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExplanationError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// One request to the generative service, no fallback
    pub async fn generate(
        &self,
        label: ClassificationLabel,
        confidence: f64,
        image: Option<&InlineImage>,
    ) -> Result<String, ExplanationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ExplanationError::MissingApiKey)?;

        let prompt = render_prompt(&self.config.prompt_template, label, confidence);
        let request = build_request(prompt, image, self.config.temperature);

        debug!(
            model = %self.config.model,
            with_image = image.is_some(),
            "Requesting clinical explanation"
        );

        let response = self
            .http_client
            .post(self.config.generate_url())
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExplanationError::Api(status.as_u16(), error_text));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ExplanationError::Timeout(self.config.timeout)
            } else {
                ExplanationError::Parse(e.to_string())
            }
        })?;

        body.text().ok_or(ExplanationError::Empty)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ExplanationError {
        if e.is_timeout() {
            ExplanationError::Timeout(self.config.timeout)
        } else {
            ExplanationError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl Explainer for GenerativeExplainer {
    async fn explain(
        &self,
        label: ClassificationLabel,
        confidence: f64,
        image: Option<&InlineImage>,
    ) -> String {
        match self.generate(label, confidence, image).await {
            Ok(text) => {
                info!(chars = text.len(), "Clinical explanation generated");
                text
            }
            Err(ExplanationError::Empty) => {
                warn!("Explanation service returned no text");
                EMPTY_REPORT_FALLBACK.to_string()
            }
            Err(ExplanationError::MissingApiKey) => {
                warn!("Explanation skipped: no API key configured");
                REPORT_ERROR_FALLBACK.to_string()
            }
            Err(e) => {
                error!(error = %e, "Explanation service error");
                REPORT_ERROR_FALLBACK.to_string()
            }
        }
    }
}
