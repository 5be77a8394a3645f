//! Analysis API handlers
//!
//! GET /api/analysis, POST /api/analysis/start, POST /api/analysis/cancel

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{DashboardSnapshot, RunState},
    services::StartOutcome,
    AppState,
};

/// POST /api/analysis/start response
#[derive(Debug, Serialize)]
pub struct StartRunResponse {
    pub run_id: Uuid,
    pub state: RunState,
}

/// POST /api/analysis/cancel response
#[derive(Debug, Serialize)]
pub struct CancelRunResponse {
    pub run_id: Uuid,
    pub state: RunState,
}

/// GET /api/analysis
///
/// Current run state and pending upload.
pub async fn get_analysis(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.orchestrator.snapshot().await)
}

/// POST /api/analysis/start
///
/// 202 when a run started; 409 while another run is analyzing; 400 when no
/// image is selected. Neither rejection changes state.
pub async fn start_analysis(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<StartRunResponse>)> {
    match state.orchestrator.start_run().await {
        StartOutcome::Started(handle) => {
            let run_id = handle.run_id();
            tracing::info!(run_id = %run_id, "Analysis requested");

            Ok((
                StatusCode::ACCEPTED,
                Json(StartRunResponse {
                    run_id,
                    state: state.orchestrator.state().await,
                }),
            ))
        }
        StartOutcome::AlreadyRunning { run_id } => Err(ApiError::Conflict(format!(
            "Analysis already running: {}",
            run_id
        ))),
        StartOutcome::NoUpload => Err(ApiError::BadRequest("No image selected".to_string())),
    }
}

/// POST /api/analysis/cancel
pub async fn cancel_analysis(State(state): State<AppState>) -> ApiResult<Json<CancelRunResponse>> {
    let run_id = state
        .orchestrator
        .cancel()
        .await
        .ok_or_else(|| ApiError::Conflict("No analysis running".to_string()))?;

    Ok(Json(CancelRunResponse {
        run_id,
        state: state.orchestrator.state().await,
    }))
}

/// Build analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/api/analysis", get(get_analysis))
        .route("/api/analysis/start", post(start_analysis))
        .route("/api/analysis/cancel", post(cancel_analysis))
}
