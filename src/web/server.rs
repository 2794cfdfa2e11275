//! Web server for FileShare.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::backend::Backend;
use crate::config::{BackendKind, Config, RetentionConfig};
use crate::share::start_retention_task;
use crate::{Result, ShareError};

use super::handlers::AppState;
use super::middleware::RateLimitState;
use super::router::{create_health_router, create_object_router, create_router};

/// How often stale upload tickets are swept.
const PROGRESS_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Web server for the pages and API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Upload rate limiting.
    rate_limit: Arc<RateLimitState>,
    /// Allowed CORS origins.
    cors_origins: Vec<String>,
    /// Local object directory to serve, if the local backend is in use.
    objects_dir: Option<String>,
    /// Expiry settings.
    retention: RetentionConfig,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &Config, backend: Backend) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| ShareError::Config(format!("invalid server address: {e}")))?;

        let app_state = AppState::new(config, backend)?;

        let objects_dir = match config.backend.kind {
            BackendKind::Local => Some(config.backend.local.storage_path.clone()),
            BackendKind::Supabase => None,
        };

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            rate_limit: Arc::new(RateLimitState::new(config.upload.rate_limit_per_minute)),
            cors_origins: config.server.cors_origins.clone(),
            objects_dir,
            retention: config.retention.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Assemble the full router.
    pub fn router(&self) -> Router {
        let mut router = create_router(
            self.app_state.clone(),
            self.rate_limit.clone(),
            &self.cors_origins,
        )
        .merge(create_health_router());

        if let Some(dir) = &self.objects_dir {
            router = router.merge(create_object_router(dir));
        }

        router.layer(CompressionLayer::new())
    }

    /// Start the background tasks: ticket sweep, rate-limit cleanup, retention.
    fn start_background_tasks(&self) {
        self.app_state
            .progress
            .clone()
            .start_sweep_task(PROGRESS_SWEEP_INTERVAL);
        self.rate_limit.clone().start_cleanup_task();

        if self.retention.enabled() {
            start_retention_task(
                self.app_state.backend.clone(),
                self.retention.days,
                Duration::from_secs(self.retention.sweep_interval_secs),
            );
        }
    }

    async fn bind(self) -> std::io::Result<(TcpListener, Router)> {
        let router = self.router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        // Start background tasks after successful bind
        self.start_background_tasks();

        tracing::info!("Web server listening on http://{}", local_addr);
        Ok((listener, router))
    }

    /// Run the web server.
    pub async fn run(self) -> std::io::Result<()> {
        let (listener, router) = self.bind().await?;

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let (listener, router) = self.bind().await?;
        let local_addr = listener.local_addr()?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
