//! Error types for cxr-dash HTTP handlers
//!
//! Every error renders as `{"error": {"code": ..., "message": ...}}`.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::IntakeError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., analysis already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upload rejected by intake (400)
    #[error(transparent)]
    Intake(#[from] IntakeError),

    /// Malformed or oversized multipart body
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Intake(ref err) => (StatusCode::BAD_REQUEST, "INVALID_IMAGE", err.to_string()),
            ApiError::Multipart(ref err) => (err.status(), "INVALID_UPLOAD", err.body_text()),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
