//! Upload API handlers
//!
//! POST /api/upload, GET /preview/{upload_id}

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{RunState, UploadSummary},
    AppState,
};

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// Room for multipart boundaries and headers on top of the image limit
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// POST /api/upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub upload: UploadSummary,
    pub state: RunState,
}

/// POST /api/upload
///
/// Accepts one multipart `image` field, from either the drop zone or the
/// file picker. Replaces any pending upload and resets the state to idle.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;

        let upload = state.intake.accept(file_name, content_type, bytes)?;
        let summary = state.orchestrator.select_file(upload).await;

        return Ok(Json(UploadResponse {
            upload: summary,
            state: state.orchestrator.state().await,
        }));
    }

    Err(ApiError::BadRequest("No image uploaded".to_string()))
}

/// GET /preview/{upload_id}
///
/// Only the current upload's preview is live; replaced previews are 404.
pub async fn get_preview(
    State(state): State<AppState>,
    Path(upload_id): Path<Uuid>,
) -> ApiResult<Response> {
    let entry = state
        .previews
        .get(upload_id)
        .ok_or_else(|| ApiError::NotFound(format!("Preview not found: {}", upload_id)))?;

    let body: Bytes = entry.bytes;
    Ok((
        [
            (header::CONTENT_TYPE, entry.mime_type),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        body,
    )
        .into_response())
}

/// Build upload routes
pub fn upload_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/api/upload",
            post(upload_image)
                .layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/preview/:upload_id", get(get_preview))
}
