//! Static pages.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Response};
use minijinja::context;

use super::AppState;

/// GET / - Landing page.
pub async fn home(State(state): State<Arc<AppState>>) -> Response {
    state.page(StatusCode::OK, "home.html", context! {})
}

/// Fallback for unknown paths.
pub async fn not_found_page(State(state): State<Arc<AppState>>) -> Response {
    state.page(StatusCode::NOT_FOUND, "not_found.html", context! {})
}
