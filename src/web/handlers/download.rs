//! Download page, redirect, QR code, and file metadata.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use minijinja::context;

use super::AppState;
use crate::backend::FileRecord;
use crate::share::{qr, resolve, share_url, DownloadState, FileCard};
use crate::web::dto::{ApiResponse, FileResponse};
use crate::web::error::ApiError;

async fn lookup(state: &AppState, download_id: &str) -> Option<FileRecord> {
    match resolve(state.backend.records().as_ref(), download_id).await {
        DownloadState::Found(record) => Some(record),
        _ => None,
    }
}

fn not_found(state: &AppState) -> Response {
    state.page(StatusCode::NOT_FOUND, "not_found.html", context! {})
}

/// GET /download/:download_id - Download page.
pub async fn download_page(
    State(state): State<Arc<AppState>>,
    Path(download_id): Path<String>,
) -> Response {
    let Some(record) = lookup(&state, &download_id).await else {
        return not_found(&state);
    };

    let ctx = context! {
        file => FileCard::new(&record.filename, record.size(), &record.file_type),
        download_url => record.download_url,
        file_url => format!("/download/{}/file", urlencoding::encode(&download_id)),
        uploaded_at => record.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    };
    state.page(StatusCode::OK, "download.html", ctx)
}

/// GET /download/:download_id/file - Redirect to the stored object.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(download_id): Path<String>,
) -> Response {
    match lookup(&state, &download_id).await {
        Some(record) => (
            StatusCode::FOUND,
            [(header::LOCATION, record.download_url)],
        )
            .into_response(),
        None => not_found(&state),
    }
}

/// GET /download/:download_id/qr.svg - QR code of the share link.
pub async fn qr_code(
    State(state): State<Arc<AppState>>,
    Path(download_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let record = lookup(&state, &download_id)
        .await
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    let url = share_url(&state.request_origin(&headers), &record.download_id);
    let svg = qr::render_svg(&url)?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        svg,
    )
        .into_response())
}

/// GET /api/files/:download_id - File metadata.
pub async fn file_info(
    State(state): State<Arc<AppState>>,
    Path(download_id): Path<String>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let record = lookup(&state, &download_id)
        .await
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    Ok(Json(ApiResponse::new(FileResponse::from(record))))
}
