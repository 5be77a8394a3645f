//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::config::FallbackPolicy;
use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok")
    pub status: String,
    /// Module name ("cxr-dash")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Active classifier fallback policy
    pub fallback_policy: FallbackPolicy,
    /// Classification service base URL
    pub classifier_url: String,
    /// Whether an explanation credential is configured
    pub explanation_configured: bool,
    /// Raw detail of the last failed run, if any (diagnostics only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "cxr-dash".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        fallback_policy: state.config.classifier.fallback_policy,
        classifier_url: state.config.classifier.base_url.clone(),
        explanation_configured: state.config.explanation.api_key.is_some(),
        last_error: state.orchestrator.last_error().await,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
