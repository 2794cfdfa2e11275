//! Rate limiting middleware for upload endpoints.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    num::NonZeroU32,
    sync::{Arc, RwLock},
    time::Duration,
};

use crate::web::error::ApiError;
use crate::web::handlers::{rate_limited_page, AppState};

/// Per-IP rate limiter using Governor.
pub type IpRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// State for rate limiting.
#[derive(Clone)]
pub struct RateLimitState {
    /// Per-IP rate limiters for upload endpoints.
    upload_limiters: Arc<RwLock<HashMap<String, Arc<IpRateLimiter>>>>,
    /// Upload rate limit (requests per minute).
    upload_rate_limit: u32,
}

impl RateLimitState {
    /// Create a new rate limit state.
    pub fn new(upload_rate_limit: u32) -> Self {
        Self {
            upload_limiters: Arc::new(RwLock::new(HashMap::new())),
            upload_rate_limit,
        }
    }

    /// Get or create a rate limiter for the given IP.
    fn get_or_create_limiter(
        limiters: &RwLock<HashMap<String, Arc<IpRateLimiter>>>,
        ip: &str,
        requests_per_minute: u32,
    ) -> Arc<IpRateLimiter> {
        {
            let read_guard = limiters.read().unwrap_or_else(|e| e.into_inner());
            if let Some(limiter) = read_guard.get(ip) {
                return limiter.clone();
            }
        }

        let mut write_guard = limiters.write().unwrap_or_else(|e| e.into_inner());

        // Double-check after acquiring write lock
        if let Some(limiter) = write_guard.get(ip) {
            return limiter.clone();
        }

        let quota =
            Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN));
        let limiter = Arc::new(RateLimiter::direct(quota));
        write_guard.insert(ip.to_string(), limiter.clone());
        limiter
    }

    /// Check if an upload is allowed for the given IP.
    pub fn check_upload(&self, ip: &str) -> bool {
        let limiter =
            Self::get_or_create_limiter(&self.upload_limiters, ip, self.upload_rate_limit);
        limiter.check().is_ok()
    }

    /// Number of tracked client IPs.
    pub fn tracked(&self) -> usize {
        self.upload_limiters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Drop limiters that are back at full capacity.
    pub fn cleanup(&self) {
        let mut guard = self
            .upload_limiters
            .write()
            .unwrap_or_else(|e| e.into_inner());
        let burst = full_burst(self.upload_rate_limit);
        // A limiter that can still grant a full burst has nothing to remember.
        guard.retain(|_, limiter| {
            Arc::strong_count(limiter) > 1 || !matches!(limiter.check_n(burst), Ok(Ok(())))
        });
    }

    /// Start a background task to periodically clean up old entries.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(300)).await;
                self.cleanup();
            }
        });
    }
}

fn full_burst(requests_per_minute: u32) -> NonZeroU32 {
    NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN)
}

/// Extract client IP from request.
pub(crate) fn get_client_ip(req: &Request<Body>) -> String {
    // Reverse proxy headers first
    if let Some(forwarded) = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(ip) = forwarded.split(',').next() {
            return ip.trim().to_string();
        }
    }

    if let Some(real_ip) = req
        .headers()
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
    {
        return real_ip.to_string();
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

fn allow_upload(state: &RateLimitState, req: &Request<Body>) -> bool {
    let ip = get_client_ip(req);
    let allowed = state.check_upload(&ip);
    if !allowed {
        tracing::warn!(ip = %ip, "Upload rate limit exceeded");
    }
    allowed
}

/// Rate limiting middleware for the upload API.
pub async fn upload_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !allow_upload(&state, &req) {
        return ApiError::too_many_requests("Too many uploads. Please try again later.")
            .into_response();
    }

    next.run(req).await
}

/// Rate limiting middleware for the HTML upload form.
///
/// Over-limit submissions get the upload page back with a notice.
pub async fn upload_form_rate_limit(
    state: Arc<RateLimitState>,
    app: Arc<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !allow_upload(&state, &req) {
        return rate_limited_page(&app);
    }

    next.run(req).await
}
