//! Router configuration.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    middleware,
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    download_file, download_page, file_info, home, not_found_page, qr_code, upload_api,
    upload_form, upload_page, upload_progress, AppState,
};
use super::middleware::{
    create_cors_layer, security_headers, upload_form_rate_limit, upload_rate_limit,
    RateLimitState,
};

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Request body limit for upload routes.
pub fn upload_body_limit(max_upload_size: u64) -> usize {
    usize::try_from(max_upload_size.saturating_add(MULTIPART_OVERHEAD)).unwrap_or(usize::MAX)
}

/// Create the main router: pages and JSON API.
pub fn create_router(
    app_state: Arc<AppState>,
    rate_limit: Arc<RateLimitState>,
    cors_origins: &[String],
) -> Router {
    let body_limit = DefaultBodyLimit::max(upload_body_limit(app_state.max_upload_size));

    let api_limit = rate_limit.clone();
    let api_layers = ServiceBuilder::new()
        .layer(middleware::from_fn(move |req, next| {
            let state = api_limit.clone();
            upload_rate_limit(state, req, next)
        }))
        .layer(body_limit.clone());

    let form_state = app_state.clone();
    let form_layers = ServiceBuilder::new()
        .layer(middleware::from_fn(move |req, next| {
            let state = rate_limit.clone();
            let app = form_state.clone();
            upload_form_rate_limit(state, app, req, next)
        }))
        .layer(body_limit);

    let api_routes = Router::new()
        .route("/files", post(upload_api).layer(api_layers))
        .route("/files/:download_id", get(file_info))
        .route("/uploads/:ticket/progress", get(upload_progress));

    Router::new()
        .route("/", get(home))
        .route(
            "/upload",
            post(upload_form).layer(form_layers).get(upload_page),
        )
        .route("/download/:download_id", get(download_page))
        .route("/download/:download_id/file", get(download_file))
        .route("/download/:download_id/qr.svg", get(qr_code))
        .nest("/api", api_routes)
        .fallback(not_found_page)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(security_headers)),
        )
        .with_state(app_state)
}

/// Serve local-backend objects under `/objects`.
///
/// Objects are sent as sandboxed attachments, never rendered inline.
pub fn create_object_router(storage_path: impl AsRef<Path>) -> Router {
    let service = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=3600"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("sandbox"),
        ))
        .service(ServeDir::new(storage_path));

    Router::new().nest_service("/objects", service)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
