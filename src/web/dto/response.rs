//! Response DTOs for the JSON API.

use serde::Serialize;

use crate::backend::FileRecord;
use crate::share::{format_file_size, FileKind};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Stored file metadata.
#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: String,
    pub download_id: String,
    pub filename: String,
    /// Size in bytes.
    pub filesize: i64,
    /// Size for display, e.g. "5 MB".
    pub size_label: String,
    pub file_type: String,
    pub icon: &'static str,
    /// Public URL of the stored object.
    pub download_url: String,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            size_label: format_file_size(record.size()),
            icon: FileKind::from_mime(&record.file_type).icon(),
            created_at: record.created_at.to_rfc3339(),
            id: record.id,
            download_id: record.download_id,
            filename: record.filename,
            filesize: record.filesize,
            file_type: record.file_type,
            download_url: record.download_url,
        }
    }
}

/// Successful upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file: FileResponse,
    /// `{origin}/download/{download_id}`.
    pub share_url: String,
    /// Relative URL of the QR code image.
    pub qr_url: String,
}

/// Upload progress for a ticket.
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub ticket: String,
    pub percent: u8,
}
