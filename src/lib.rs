//! FileShare - upload a file, get a shareable link and QR code.
//!
//! Uploaded files go to an object store and a metadata row is recorded.
//! The uploader gets `{origin}/download/{id}` and a QR code for it; the
//! download page resolves the ID back to the stored object.

pub mod backend;
pub mod config;
pub mod error;
pub mod i18n;
pub mod logging;
pub mod share;
pub mod web;

pub use backend::{Backend, FileRecord, MetadataStore, ObjectStore};
pub use config::Config;
pub use error::{Result, ShareError};
pub use share::{UploadPhase, UploadService};
pub use web::WebServer;
