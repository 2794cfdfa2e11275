//! Storage backends.
//!
//! A [`Backend`] pairs an [`ObjectStore`] for file bytes with a
//! [`MetadataStore`] for file rows. It is built once at start-up from
//! configuration and shared through the web state.

mod object;
mod record;
mod sqlite;
mod supabase;

pub use object::{
    encode_path, validate_object_path, LocalObjectStore, ObjectStore, UploadOptions,
    DEFAULT_CACHE_CONTROL,
};
pub use record::{FileRecord, MetadataStore, NewFileRecord};
pub use sqlite::{Database, SqliteMetadataStore, MIGRATIONS};
pub use supabase::SupabaseClient;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{BackendConfig, BackendKind};
use crate::Result;

/// Handle to the object store and metadata store.
#[derive(Clone)]
pub struct Backend {
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn MetadataStore>,
}

impl Backend {
    pub fn new(objects: Arc<dyn ObjectStore>, records: Arc<dyn MetadataStore>) -> Self {
        Self { objects, records }
    }

    /// Build the configured backend.
    pub async fn from_config(config: &BackendConfig) -> Result<Self> {
        match config.kind {
            BackendKind::Local => {
                let local = &config.local;
                let objects = LocalObjectStore::open(
                    &local.storage_path,
                    &config.bucket,
                    &local.public_base_url,
                )
                .await?;
                let db = Database::open(&local.database_path).await?;
                info!(
                    storage = %local.storage_path,
                    database = %local.database_path,
                    "Using local backend"
                );
                Ok(Self::new(
                    Arc::new(objects),
                    Arc::new(SqliteMetadataStore::new(db)),
                ))
            }
            BackendKind::Supabase => {
                let client = Arc::new(SupabaseClient::new(
                    &config.supabase,
                    &config.bucket,
                    &config.table,
                )?);
                info!(url = %config.supabase.url, "Using Supabase backend");
                Ok(Self::new(client.clone(), client))
            }
        }
    }

    pub fn objects(&self) -> &Arc<dyn ObjectStore> {
        &self.objects
    }

    pub fn records(&self) -> &Arc<dyn MetadataStore> {
        &self.records
    }

    /// Check that the configured bucket is visible. Returns the bucket list.
    pub async fn verify(&self) -> Result<Vec<String>> {
        let buckets = self.objects.list_buckets().await?;
        let bucket = self.objects.bucket();
        if buckets.iter().any(|b| b == bucket) {
            info!(bucket, "Storage bucket available");
        } else {
            warn!(bucket, available = ?buckets, "Storage bucket not found");
        }
        Ok(buckets)
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("bucket", &self.objects.bucket())
            .finish()
    }
}
