//! File metadata rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::Result;

/// A stored file's metadata row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileRecord {
    /// Row ID assigned by the store.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Public lookup key.
    pub download_id: String,
    /// Original filename.
    pub filename: String,
    /// Size in bytes.
    pub filesize: i64,
    /// Object path, `{download_id}/{download_id}.{ext}`.
    pub file_path: String,
    /// MIME type.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub file_type: String,
    /// Public object URL.
    pub download_url: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Size in bytes, treating negative values as zero.
    pub fn size(&self) -> u64 {
        self.filesize.max(0) as u64
    }
}

/// Data for inserting a new metadata row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewFileRecord {
    pub download_id: String,
    pub filename: String,
    pub filesize: i64,
    pub file_path: String,
    pub file_type: String,
    pub download_url: String,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Str(s) => s,
        Id::Num(n) => n.to_string(),
    })
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Tabular metadata store.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a row and return it as stored.
    async fn insert(&self, record: &NewFileRecord) -> Result<FileRecord>;

    /// Fetch the row with this download ID, if any.
    async fn find_by_download_id(&self, download_id: &str) -> Result<Option<FileRecord>>;

    /// Rows created strictly before `cutoff`.
    async fn list_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<FileRecord>>;

    /// Delete a row by row ID. Returns whether a row was removed.
    async fn delete(&self, id: &str) -> Result<bool>;
}
