//! Request DTOs for the JSON API.

use serde::Deserialize;

/// Query parameters for `POST /api/files`.
#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    /// Client-chosen ticket for polling upload progress.
    pub ticket: Option<String>,
}
