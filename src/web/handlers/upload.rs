//! Upload handlers: the HTML form and the JSON API.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use bytes::BytesMut;
use serde::Serialize;

use super::AppState;
use crate::config::ProgressMode;
use crate::share::{
    base_name, format_file_size, validate, FileCard, Notice, ProgressRegistry, Selection,
    TickerGuard, UploadPhase, UploadProgress, UploadedFile,
};
use crate::web::dto::{ApiResponse, FileResponse, UploadQuery, UploadResponse};
use crate::web::error::ApiError;
use crate::{Result, ShareError};

/// Multipart field carrying the file.
pub const FILE_FIELD: &str = "file";

/// Relative URL of the QR code for a download ID.
pub fn qr_url(download_id: &str) -> String {
    format!("/download/{}/qr.svg", urlencoding::encode(download_id))
}

fn multipart_error(e: MultipartError, received: u64, limit: u64) -> ShareError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ShareError::FileTooLarge {
            size: received,
            limit,
        }
    } else {
        ShareError::Validation(format!("invalid multipart data: {}", e.body_text()))
    }
}

/// Read the `file` field of a multipart body.
///
/// The body is streamed chunk by chunk and rejected as soon as the file
/// passes `limit`. When `progress` is given, bytes received are reported
/// against `expected` (the request's Content-Length). A later `file` field
/// replaces an earlier one; an empty file input counts as no selection.
pub async fn receive(
    mut multipart: Multipart,
    limit: u64,
    progress: Option<&UploadProgress>,
    expected: u64,
) -> Result<UploadedFile> {
    let mut received: u64 = 0;
    let mut file: Option<UploadedFile> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, received, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(base_name).unwrap_or("").to_string();
        let content_type = field
            .content_type()
            .filter(|ct| !ct.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&filename)
                    .first_or_octet_stream()
                    .to_string()
            });

        let mut data = BytesMut::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, data.len() as u64, limit))?
        {
            received += chunk.len() as u64;
            data.extend_from_slice(&chunk);
            if data.len() as u64 > limit {
                return Err(ShareError::FileTooLarge {
                    size: data.len() as u64,
                    limit,
                });
            }
            if let Some(progress) = progress {
                progress.report_transfer(received, expected);
            }
        }

        if filename.is_empty() && data.is_empty() {
            continue;
        }

        file = Some(UploadedFile {
            filename,
            content_type,
            data: data.freeze(),
        });
    }

    validate(file.as_ref(), limit)?;
    file.ok_or(ShareError::NoFileSelected)
}

fn notice_for(err: &ShareError) -> Notice {
    match err {
        ShareError::NoFileSelected => Notice::NoFile,
        ShareError::FileTooLarge { .. } => Notice::TooLarge,
        _ => Notice::Failed,
    }
}

#[derive(Debug, Serialize)]
struct NoticeView {
    title: String,
    detail: String,
}

#[derive(Debug, Serialize)]
struct UploadPageContext {
    phase: &'static str,
    file: Option<FileCard>,
    notice: Option<NoticeView>,
    share_url: Option<String>,
    qr_url: Option<String>,
    percent: Option<u8>,
}

fn render_phase(
    state: &AppState,
    status: StatusCode,
    phase: &UploadPhase,
    download_id: Option<&str>,
) -> Response {
    let (notice, share_url) = match phase {
        UploadPhase::Failed { notice, .. } => {
            let (title, detail) = notice.keys();
            let limit = format_file_size(state.max_upload_size).replace(' ', "");
            let view = NoticeView {
                title: state.i18n.t(title).to_string(),
                detail: state.i18n.t_with(detail, &[("limit", limit.as_str())]),
            };
            (Some(view), None)
        }
        UploadPhase::Complete { share_url, .. } => (None, Some(share_url.clone())),
        _ => (None, None),
    };

    let ctx = UploadPageContext {
        phase: phase.name(),
        file: phase.selection().map(Selection::card),
        notice,
        share_url,
        qr_url: download_id.map(qr_url),
        percent: phase.percent(),
    };
    state.page(status, "upload.html", ctx)
}

/// GET /upload - Upload form.
pub async fn upload_page(State(state): State<Arc<AppState>>) -> Response {
    render_phase(&state, StatusCode::OK, &UploadPhase::Idle, None)
}

/// Upload form shown again with the rate-limit notice.
pub fn rate_limited_page(state: &AppState) -> Response {
    let phase = UploadPhase::Idle.fail(Notice::RateLimited);
    render_phase(state, StatusCode::TOO_MANY_REQUESTS, &phase, None)
}

/// POST /upload - Form submission without JavaScript.
///
/// Renders the completed page with the share link, or the form again with
/// an error notice.
pub async fn upload_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let limit = state.uploads.limit();

    let file = match receive(multipart, limit, None, 0).await {
        Ok(file) => file,
        Err(e) => {
            let phase = UploadPhase::Idle.fail(notice_for(&e));
            let status = ApiError::from(e).code().status_code();
            return render_phase(&state, status, &phase, None);
        }
    };

    let selection = Selection::new(&file.filename, file.size(), &file.content_type);
    let phase = UploadPhase::Idle.select(selection).submit(limit);

    let origin = state.request_origin(&headers);
    match state.uploads.publish(file, &origin).await {
        Ok(published) => {
            let download_id = published.record.download_id.clone();
            let phase = phase.complete(published.share_url);
            render_phase(&state, StatusCode::OK, &phase, Some(&download_id))
        }
        Err(e) => {
            let phase = phase.fail(notice_for(&e));
            let status = ApiError::from(e).code().status_code();
            render_phase(&state, status, &phase, None)
        }
    }
}

/// POST /api/files - Upload a file.
///
/// Request body: multipart/form-data with a "file" field. With `?ticket=`,
/// progress is readable at `/api/uploads/{ticket}/progress`.
pub async fn upload_api(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    multipart: Multipart,
) -> std::result::Result<Json<ApiResponse<UploadResponse>>, ApiError> {
    let progress = match query.ticket.as_deref() {
        Some(ticket) if !ProgressRegistry::is_valid_ticket(ticket) => {
            return Err(ApiError::bad_request("Invalid upload ticket"));
        }
        Some(ticket) => Some(state.progress.register(ticket).await),
        None => None,
    };

    let mode = state.progress.mode();
    let ticker = match (&progress, mode) {
        (Some(progress), ProgressMode::Synthetic) => progress.start_synthetic(),
        _ => TickerGuard::none(),
    };
    let transfer = progress
        .as_ref()
        .filter(|_| mode == ProgressMode::Transfer);
    let expected = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    let origin = state.request_origin(&headers);
    let result = async {
        let file = receive(multipart, state.uploads.limit(), transfer, expected).await?;
        state.uploads.publish(file, &origin).await
    }
    .await;
    drop(ticker);

    match result {
        Ok(published) => {
            if let Some(progress) = &progress {
                progress.complete();
            }
            let qr_url = qr_url(&published.record.download_id);
            Ok(Json(ApiResponse::new(UploadResponse {
                file: FileResponse::from(published.record),
                share_url: published.share_url,
                qr_url,
            })))
        }
        Err(e) => {
            if let Some(progress) = &progress {
                progress.fail();
            }
            if e.is_rejection() {
                tracing::info!(error = %e, "Upload rejected");
            }
            Err(e.into())
        }
    }
}
