//! Resolving a download identifier to a file record.

use tracing::{debug, warn};

use crate::backend::{FileRecord, MetadataStore};

/// What the download page shows.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadState {
    /// Lookup in flight.
    Loading,
    /// No such record, or the lookup failed.
    NotFound,
    /// The record was found.
    Found(FileRecord),
}

impl DownloadState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DownloadState::Loading)
    }

    pub fn record(&self) -> Option<&FileRecord> {
        match self {
            DownloadState::Found(record) => Some(record),
            _ => None,
        }
    }
}

/// Look up `download_id`. Store errors collapse into `NotFound`.
pub async fn resolve(records: &dyn MetadataStore, download_id: &str) -> DownloadState {
    if download_id.is_empty() {
        return DownloadState::NotFound;
    }

    match records.find_by_download_id(download_id).await {
        Ok(Some(record)) => DownloadState::Found(record),
        Ok(None) => {
            debug!(download_id, "No file record");
            DownloadState::NotFound
        }
        Err(e) => {
            warn!(download_id, error = %e, "File lookup failed");
            DownloadState::NotFound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Database, NewFileRecord, SqliteMetadataStore};
    use crate::{Result, ShareError};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    struct BrokenStore;

    #[async_trait]
    impl MetadataStore for BrokenStore {
        async fn insert(&self, _: &NewFileRecord) -> Result<FileRecord> {
            Err(ShareError::Database("down".into()))
        }
        async fn find_by_download_id(&self, _: &str) -> Result<Option<FileRecord>> {
            Err(ShareError::Database("down".into()))
        }
        async fn list_created_before(&self, _: DateTime<Utc>) -> Result<Vec<FileRecord>> {
            Err(ShareError::Database("down".into()))
        }
        async fn delete(&self, _: &str) -> Result<bool> {
            Err(ShareError::Database("down".into()))
        }
    }

    #[tokio::test]
    async fn test_resolve_found_and_missing() {
        let store = SqliteMetadataStore::new(Database::open_in_memory().await.unwrap());
        store
            .insert(&NewFileRecord {
                download_id: "abc".into(),
                filename: "a.txt".into(),
                filesize: 3,
                file_path: "abc/abc.txt".into(),
                file_type: "text/plain".into(),
                download_url: "/objects/files/abc/abc.txt".into(),
            })
            .await
            .unwrap();

        let state = resolve(&store, "abc").await;
        assert_eq!(state.record().unwrap().filename, "a.txt");
        assert!(state.is_terminal());

        assert_eq!(resolve(&store, "does-not-exist").await, DownloadState::NotFound);
        assert_eq!(resolve(&store, "").await, DownloadState::NotFound);
    }

    #[tokio::test]
    async fn test_resolve_error_is_not_found() {
        assert_eq!(resolve(&BrokenStore, "abc").await, DownloadState::NotFound);
    }

    #[test]
    fn test_loading_is_not_terminal() {
        assert!(!DownloadState::Loading.is_terminal());
        assert!(DownloadState::NotFound.is_terminal());
    }
}
