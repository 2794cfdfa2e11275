//! Upload progress polling.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use super::AppState;
use crate::web::dto::{ApiResponse, ProgressResponse};
use crate::web::error::ApiError;

/// GET /api/uploads/:ticket/progress - Current upload percentage.
pub async fn upload_progress(
    State(state): State<Arc<AppState>>,
    Path(ticket): Path<String>,
) -> Result<Json<ApiResponse<ProgressResponse>>, ApiError> {
    let progress = state
        .progress
        .get(&ticket)
        .await
        .ok_or_else(|| ApiError::not_found("Upload not found"))?;

    Ok(Json(ApiResponse::new(ProgressResponse {
        percent: progress.percent(),
        ticket,
    })))
}
