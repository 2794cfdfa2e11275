//! Request handlers and shared application state.

pub mod download;
pub mod pages;
pub mod progress;
pub mod upload;

pub use download::*;
pub use pages::*;
pub use progress::*;
pub use upload::*;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;

use crate::backend::Backend;
use crate::config::Config;
use crate::i18n::I18n;
use crate::share::{ProgressRegistry, UploadService};
use crate::web::views::{SiteInfo, Views};
use crate::Result;

/// How long an upload ticket stays readable after it was registered.
pub const PROGRESS_TTL: Duration = Duration::from_secs(600);

/// Application state shared across handlers.
pub struct AppState {
    /// Two-phase publisher.
    pub uploads: UploadService,
    /// Object and metadata stores.
    pub backend: Backend,
    /// Upload progress by ticket.
    pub progress: ProgressRegistry,
    /// Page templates.
    pub views: Views,
    /// Active message catalog.
    pub i18n: Arc<I18n>,
    /// Configured public origin for share links.
    pub public_origin: Option<String>,
    /// Maximum upload size in bytes.
    pub max_upload_size: u64,
}

impl AppState {
    /// Build the state from configuration and an opened backend.
    pub fn new(config: &Config, backend: Backend) -> Result<Self> {
        let max_upload_size = config.upload.max_size_bytes();
        let i18n = Arc::new(I18n::builtin_or_default(&config.site.language));
        let site = SiteInfo::new(
            &config.site.name,
            i18n.locale(),
            max_upload_size,
            config.retention.days,
        );
        let views = Views::new(i18n.clone(), site)?;

        Ok(Self {
            uploads: UploadService::new(
                backend.clone(),
                max_upload_size,
                config.upload.cleanup_orphans,
            ),
            backend,
            progress: ProgressRegistry::new(config.upload.progress, PROGRESS_TTL),
            views,
            i18n,
            public_origin: config
                .server
                .public_origin
                .as_ref()
                .map(|o| o.trim_end_matches('/').to_string())
                .filter(|o| !o.is_empty()),
            max_upload_size,
        })
    }

    /// Origin used to build share links for this request.
    ///
    /// The configured public origin wins; otherwise the forwarded or direct
    /// `Host` header is used.
    pub fn request_origin(&self, headers: &HeaderMap) -> String {
        if let Some(origin) = &self.public_origin {
            return origin.clone();
        }

        let first = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = first("X-Forwarded-Host")
            .or_else(|| first(header::HOST.as_str()))
            .unwrap_or_else(|| "localhost".to_string());
        let proto = first("X-Forwarded-Proto").unwrap_or_else(|| "http".to_string());

        format!("{proto}://{host}")
    }

    /// Render a page, answering 500 if the template fails.
    pub fn page<S: Serialize>(&self, status: StatusCode, name: &str, ctx: S) -> Response {
        match self.views.render(name, ctx) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!(template = name, error = %e, "Failed to render page");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("backend", &self.backend)
            .field("public_origin", &self.public_origin)
            .field("max_upload_size", &self.max_upload_size)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::backend::{Database, LocalObjectStore, SqliteMetadataStore};
    use tempfile::TempDir;

    /// State over a local backend in `dir` with an in-memory database.
    pub async fn state(dir: &TempDir, config: &Config) -> Arc<AppState> {
        let objects = LocalObjectStore::open(dir.path(), "files", "/objects")
            .await
            .unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let backend = Backend::new(Arc::new(objects), Arc::new(SqliteMetadataStore::new(db)));
        Arc::new(AppState::new(config, backend).unwrap())
    }
}
