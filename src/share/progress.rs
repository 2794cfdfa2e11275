//! Upload progress reporting.
//!
//! An [`UploadProgress`] publishes a percentage through a `watch` channel.
//! While the upload is in flight the value never exceeds [`CEILING`]; it
//! snaps to 100 on completion and back to 0 on failure. In synthetic mode a
//! ticker task ramps the value up on a fixed schedule, in transfer mode the
//! caller reports bytes received.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use crate::config::ProgressMode;

/// Highest value reported before the upload settles.
pub const CEILING: u8 = 90;

/// Synthetic ramp step.
pub const SYNTHETIC_STEP: u8 = 10;

/// Synthetic ramp interval.
pub const SYNTHETIC_INTERVAL: Duration = Duration::from_millis(500);

struct Inner {
    sender: watch::Sender<u8>,
    settled: AtomicBool,
}

/// Progress of a single upload.
#[derive(Clone)]
pub struct UploadProgress {
    inner: Arc<Inner>,
}

impl UploadProgress {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                sender,
                settled: AtomicBool::new(false),
            }),
        }
    }

    /// Current percentage.
    pub fn percent(&self) -> u8 {
        *self.inner.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u8> {
        self.inner.sender.subscribe()
    }

    pub fn is_settled(&self) -> bool {
        self.inner.settled.load(Ordering::Acquire)
    }

    /// Raise the value to `value`, capped at [`CEILING`]. Never lowers it.
    fn raise_to(&self, value: u8) -> bool {
        if self.is_settled() {
            return false;
        }
        let value = value.min(CEILING);
        self.inner.sender.send_if_modified(|current| {
            if value > *current {
                *current = value;
                true
            } else {
                false
            }
        })
    }

    /// Report `received` of `total` bytes.
    pub fn report_transfer(&self, received: u64, total: u64) {
        if total == 0 {
            return;
        }
        let percent = (received.saturating_mul(100) / total).min(100) as u8;
        self.raise_to(percent);
    }

    /// Advance the synthetic ramp by one step. Returns false once the ramp is done.
    pub fn tick(&self) -> bool {
        if self.is_settled() {
            return false;
        }
        let next = self.percent().saturating_add(SYNTHETIC_STEP);
        self.raise_to(next);
        self.percent() < CEILING
    }

    /// Spawn the synthetic ramp. The task stops at the ceiling or when the
    /// upload settles, and is aborted when the returned guard is dropped.
    pub fn start_synthetic(&self) -> TickerGuard {
        let progress = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(SYNTHETIC_INTERVAL);
            // first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if !progress.tick() {
                    break;
                }
            }
        });
        TickerGuard(Some(handle))
    }

    /// Snap to 100.
    pub fn complete(&self) {
        self.inner.settled.store(true, Ordering::Release);
        self.inner.sender.send_replace(100);
    }

    /// Reset to 0.
    pub fn fail(&self) {
        self.inner.settled.store(true, Ordering::Release);
        self.inner.sender.send_replace(0);
    }
}

impl Default for UploadProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UploadProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadProgress")
            .field("percent", &self.percent())
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// Aborts the synthetic ticker when dropped.
pub struct TickerGuard(Option<JoinHandle<()>>);

impl TickerGuard {
    /// A guard with no task behind it.
    pub fn none() -> Self {
        Self(None)
    }
}

impl Drop for TickerGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

struct Entry {
    progress: UploadProgress,
    touched: Instant,
}

/// Progress entries keyed by a client-chosen ticket.
#[derive(Clone)]
pub struct ProgressRegistry {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    mode: ProgressMode,
    ttl: Duration,
}

/// Longest accepted ticket.
pub const MAX_TICKET_LEN: usize = 64;

impl ProgressRegistry {
    pub fn new(mode: ProgressMode, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            mode,
            ttl,
        }
    }

    pub fn mode(&self) -> ProgressMode {
        self.mode
    }

    /// Whether a ticket is acceptable: 1-64 ASCII alphanumerics, `-` or `_`.
    pub fn is_valid_ticket(ticket: &str) -> bool {
        !ticket.is_empty()
            && ticket.len() <= MAX_TICKET_LEN
            && ticket
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    /// Register a fresh progress entry, replacing any earlier one for the ticket.
    pub async fn register(&self, ticket: &str) -> UploadProgress {
        let progress = UploadProgress::new();
        let mut entries = self.entries.write().await;
        entries.insert(
            ticket.to_string(),
            Entry {
                progress: progress.clone(),
                touched: Instant::now(),
            },
        );
        progress
    }

    pub async fn get(&self, ticket: &str) -> Option<UploadProgress> {
        let entries = self.entries.read().await;
        entries.get(ticket).map(|e| e.progress.clone())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop entries registered longer ago than the TTL. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, e| e.touched.elapsed() < ttl);
        before - entries.len()
    }

    /// Start a background task to periodically sweep stale tickets.
    pub fn start_sweep_task(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = self.sweep().await;
                if removed > 0 {
                    tracing::debug!(removed, "Swept stale upload tickets");
                }
            }
        })
    }
}
