//! Error types for FileShare.

use thiserror::Error;

/// Common error type for FileShare.
#[derive(Error, Debug)]
pub enum ShareError {
    /// No file was chosen before submitting.
    #[error("no file selected")]
    NoFileSelected,

    /// The selected file is over the upload limit.
    #[error("file too large: {size} bytes (max {limit} bytes)")]
    FileTooLarge {
        /// Size of the rejected file in bytes (bytes received so far when streaming).
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Object store error (upload, removal, bucket listing).
    #[error("storage error: {0}")]
    Storage(String),

    /// Metadata store error.
    ///
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// Transport error talking to the hosted backend.
    #[error("HTTP error: {0}")]
    Http(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Page rendering error.
    #[error("render error: {0}")]
    Render(String),

    /// QR code generation error.
    #[error("QR code error: {0}")]
    Qr(#[from] qrcode::types::QrError),
}

impl ShareError {
    /// Whether this error was raised before any backend call was made.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ShareError::NoFileSelected | ShareError::FileTooLarge { .. } | ShareError::Validation(_)
        )
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for ShareError {
    fn from(e: sqlx::Error) -> Self {
        ShareError::Database(e.to_string())
    }
}

impl From<reqwest::Error> for ShareError {
    fn from(e: reqwest::Error) -> Self {
        ShareError::Http(e.to_string())
    }
}

impl From<minijinja::Error> for ShareError {
    fn from(e: minijinja::Error) -> Self {
        ShareError::Render(e.to_string())
    }
}

/// Result type alias for FileShare operations.
pub type Result<T> = std::result::Result<T, ShareError>;
