//! File sharing: upload, lookup, and the helpers the pages render with.

pub mod download;
pub mod format;
pub mod phase;
pub mod progress;
pub mod qr;
pub mod retention;
pub mod upload;

pub use download::{resolve, DownloadState};
pub use format::{format_file_size, FileCard, FileKind, Gradient};
pub use phase::{Notice, Selection, UploadPhase};
pub use progress::{ProgressRegistry, TickerGuard, UploadProgress};
pub use retention::{start_retention_task, sweep_expired, SweepReport};
pub use upload::{
    base_name, file_extension, new_download_id, share_url, storage_path, validate, Published,
    UploadService, UploadedFile,
};
