//! cxr-dash library interface
//!
//! Exposes the application state, router, and pipeline services for the
//! binary and for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use cxr_common::events::EventBus;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::DashboardConfig;
use crate::services::{
    AnalysisOrchestrator, GenerativeExplainer, HttpClassifier, ImageIntake, PreviewStore,
};
use crate::types::{Classifier, Explainer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Run state machine; the only writer of run state
    pub orchestrator: AnalysisOrchestrator,
    /// Upload validation and preview allocation
    pub intake: ImageIntake,
    /// Live previews served at `/preview/{upload_id}`
    pub previews: PreviewStore,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Resolved configuration
    pub config: Arc<DashboardConfig>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Build state with the HTTP classification and explanation clients
    pub fn new(config: DashboardConfig, event_bus: EventBus) -> anyhow::Result<Self> {
        let classifier = HttpClassifier::new(&config.classifier)
            .map_err(|e| anyhow::anyhow!("Failed to create classifier client: {}", e))?;
        let explainer = GenerativeExplainer::new(config.explanation.clone())
            .map_err(|e| anyhow::anyhow!("Failed to create explanation client: {}", e))?;

        Ok(Self::with_stages(
            config,
            event_bus,
            Arc::new(classifier),
            Arc::new(explainer),
        ))
    }

    /// Build state with caller-supplied pipeline stages
    pub fn with_stages(
        config: DashboardConfig,
        event_bus: EventBus,
        classifier: Arc<dyn Classifier>,
        explainer: Arc<dyn Explainer>,
    ) -> Self {
        let previews = PreviewStore::new();
        let intake = ImageIntake::new(previews.clone(), &config.intake);
        let orchestrator = AnalysisOrchestrator::new(classifier, explainer, event_bus.clone());

        Self {
            orchestrator,
            intake,
            previews,
            event_bus,
            config: Arc::new(config),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        // UI routes (HTML pages)
        .merge(api::ui_routes())
        // API routes
        .merge(api::upload_routes(state.intake.max_upload_bytes()))
        .merge(api::analysis_routes())
        .merge(api::health_routes())
        .route("/api/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
