//! Publishing an uploaded file: object write, then metadata insert.

use bytes::Bytes;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::backend::{Backend, FileRecord, NewFileRecord, UploadOptions};
use crate::{Result, ShareError};

/// A file received from the browser.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename as sent by the browser.
    pub filename: String,
    /// MIME type.
    pub content_type: String,
    /// File contents.
    pub data: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Result of a successful publish.
#[derive(Debug, Clone)]
pub struct Published {
    pub record: FileRecord,
    pub share_url: String,
}

/// Fresh random download identifier.
pub fn new_download_id() -> String {
    Uuid::new_v4().to_string()
}

/// Final path component of a browser-supplied filename.
pub fn base_name(filename: &str) -> &str {
    filename.rsplit(['/', '\\']).next().unwrap_or(filename)
}

/// Text after the last `.` of the base name, or the whole base name when it has no dot.
pub fn file_extension(filename: &str) -> &str {
    let base = base_name(filename);
    base.rsplit('.').next().unwrap_or(base)
}

/// Longest extension carried into an object path.
const MAX_STORED_EXTENSION: usize = 16;

/// Object path for a download ID: `{id}/{id}.{ext}`.
///
/// The extension is dropped (`{id}/{id}`) when it is longer than
/// [`MAX_STORED_EXTENSION`] or not plain ASCII alphanumerics.
pub fn storage_path(download_id: &str, filename: &str) -> String {
    let ext = file_extension(filename);
    let keep = !ext.is_empty()
        && ext.len() <= MAX_STORED_EXTENSION
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    if keep {
        format!("{download_id}/{download_id}.{ext}")
    } else {
        format!("{download_id}/{download_id}")
    }
}

/// Public share link: `{origin}/download/{id}`.
pub fn share_url(origin: &str, download_id: &str) -> String {
    format!("{}/download/{download_id}", origin.trim_end_matches('/'))
}

/// Reject a submission before any backend call.
///
/// A size equal to `limit` is accepted.
pub fn validate(file: Option<&UploadedFile>, limit: u64) -> Result<&UploadedFile> {
    let file = file.ok_or(ShareError::NoFileSelected)?;
    if base_name(&file.filename).is_empty() {
        return Err(ShareError::NoFileSelected);
    }
    if file.size() > limit {
        return Err(ShareError::FileTooLarge {
            size: file.size(),
            limit,
        });
    }
    Ok(file)
}

/// Runs the two-phase publish against a backend.
///
/// The phases are not atomic: when the metadata insert fails the object
/// stays in the store unless `cleanup_orphans` is set.
#[derive(Debug, Clone)]
pub struct UploadService {
    backend: Backend,
    limit: u64,
    cleanup_orphans: bool,
}

impl UploadService {
    pub fn new(backend: Backend, limit: u64, cleanup_orphans: bool) -> Self {
        Self {
            backend,
            limit,
            cleanup_orphans,
        }
    }

    /// Upload limit in bytes.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Store `file` and record it, returning the record and its share link.
    pub async fn publish(&self, file: UploadedFile, origin: &str) -> Result<Published> {
        validate(Some(&file), self.limit)?;

        let download_id = new_download_id();
        let filename = base_name(&file.filename).to_string();
        let path = storage_path(&download_id, &filename);
        let filesize = file.size();
        let objects = self.backend.objects();

        let options = UploadOptions::new(file.content_type.clone());
        if let Err(e) = objects.upload(&path, file.data, &options).await {
            error!(path = %path, error = %e, "Object upload failed");
            return Err(e);
        }

        let new_record = NewFileRecord {
            download_id: download_id.clone(),
            filename,
            filesize: filesize as i64,
            file_path: path.clone(),
            file_type: file.content_type,
            download_url: objects.public_url(&path),
        };

        let record = match self.backend.records().insert(&new_record).await {
            Ok(record) => record,
            Err(e) => {
                error!(path = %path, error = %e, "Metadata insert failed");
                if self.cleanup_orphans {
                    if let Err(cleanup) = objects.remove(&path).await {
                        warn!(path = %path, error = %cleanup, "Failed to remove orphaned object");
                    }
                } else {
                    warn!(path = %path, "Leaving orphaned object in storage");
                }
                return Err(e);
            }
        };

        let share_url = share_url(origin, &record.download_id);
        info!(
            download_id = %record.download_id,
            size = filesize,
            "Published file"
        );

        Ok(Published { record, share_url })
    }
}
