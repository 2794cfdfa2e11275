//! Expiry of old uploads.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::backend::Backend;
use crate::{Result, ShareError};

/// Shortest interval the sweeper will tick at.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: usize,
}

/// Creation time before which a file has expired.
fn retention_cutoff(days: u32) -> Result<DateTime<Utc>> {
    chrono::Duration::try_days(i64::from(days))
        .and_then(|age| Utc::now().checked_sub_signed(age))
        .ok_or_else(|| ShareError::Config(format!("retention.days out of range: {days}")))
}

/// Remove files created more than `days` days ago.
///
/// The object goes first; the row is only deleted once its object is gone,
/// so a failed removal is retried on the next sweep.
pub async fn sweep_expired(backend: &Backend, days: u32) -> Result<SweepReport> {
    let cutoff = retention_cutoff(days)?;
    let expired = backend.records().list_created_before(cutoff).await?;

    let mut report = SweepReport::default();
    for record in expired {
        if let Err(e) = backend.objects().remove(&record.file_path).await {
            warn!(path = %record.file_path, error = %e, "Failed to remove expired object");
            report.failed += 1;
            continue;
        }
        match backend.records().delete(&record.id).await {
            Ok(_) => report.removed += 1,
            Err(e) => {
                warn!(id = %record.id, error = %e, "Failed to delete expired record");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Start a background task that sweeps every `every`.
pub fn start_retention_task(backend: Backend, days: u32, every: Duration) -> JoinHandle<()> {
    let every = every.max(MIN_SWEEP_INTERVAL);
    info!(days, interval_secs = every.as_secs(), "Retention sweeper enabled");
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match sweep_expired(&backend, days).await {
                Ok(report) if report.removed > 0 || report.failed > 0 => {
                    info!(
                        removed = report.removed,
                        failed = report.failed,
                        "Retention sweep finished"
                    );
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Retention sweep failed"),
            }
        }
    })
}
