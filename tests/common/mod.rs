//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum_test::TestServer;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use fileshare::backend::{
    Database, FileRecord, LocalObjectStore, MetadataStore, NewFileRecord, ObjectStore,
    SqliteMetadataStore, UploadOptions,
};
use fileshare::web::middleware::RateLimitState;
use fileshare::web::router::create_router;
use fileshare::web::AppState;
use fileshare::{Backend, Config, Result, ShareError};
use tempfile::TempDir;

/// Object store that counts calls and forwards to a local store.
pub struct CountingObjects {
    inner: LocalObjectStore,
    uploads: AtomicUsize,
    removes: AtomicUsize,
}

impl CountingObjects {
    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub fn root(&self) -> &Path {
        self.inner.root()
    }
}

#[async_trait]
impl ObjectStore for CountingObjects {
    fn bucket(&self) -> &str {
        self.inner.bucket()
    }

    async fn list_buckets(&self) -> Result<Vec<String>> {
        self.inner.list_buckets().await
    }

    async fn upload(&self, path: &str, data: Bytes, options: &UploadOptions) -> Result<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.inner.upload(path, data, options).await
    }

    fn public_url(&self, path: &str) -> String {
        self.inner.public_url(path)
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(path).await
    }
}

/// Metadata store that counts inserts and can be switched to fail them.
pub struct CountingRecords {
    inner: SqliteMetadataStore,
    inserts: AtomicUsize,
    fail_inserts: AtomicBool,
}

impl CountingRecords {
    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl MetadataStore for CountingRecords {
    async fn insert(&self, record: &NewFileRecord) -> Result<FileRecord> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(ShareError::Database(
                "permission denied for table files".to_string(),
            ));
        }
        self.inner.insert(record).await
    }

    async fn find_by_download_id(&self, download_id: &str) -> Result<Option<FileRecord>> {
        self.inner.find_by_download_id(download_id).await
    }

    async fn list_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<FileRecord>> {
        self.inner.list_created_before(cutoff).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.inner.delete(id).await
    }
}

/// Configuration used by tests: 1 MB limit, fixed public origin, English pages.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.upload.max_size_mb = 1;
    config.upload.rate_limit_per_minute = 1000;
    config.server.public_origin = Some("https://share.example.com".to_string());
    config.site.language = "en".to_string();
    config
}

/// The router over a local backend in a temp dir with an in-memory database.
pub struct TestApp {
    pub server: TestServer,
    pub objects: Arc<CountingObjects>,
    pub records: Arc<CountingRecords>,
    pub backend: Backend,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");

        let objects = Arc::new(CountingObjects {
            inner: LocalObjectStore::open(dir.path(), "files", "/objects")
                .await
                .expect("Failed to open object store"),
            uploads: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
        });

        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let records = Arc::new(CountingRecords {
            inner: SqliteMetadataStore::new(db),
            inserts: AtomicUsize::new(0),
            fail_inserts: AtomicBool::new(false),
        });

        let backend = Backend::new(objects.clone(), records.clone());
        let app_state =
            Arc::new(AppState::new(&config, backend.clone()).expect("Failed to build state"));
        let rate_limit = Arc::new(RateLimitState::new(config.upload.rate_limit_per_minute));

        let router = create_router(app_state, rate_limit, &config.server.cors_origins);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            objects,
            records,
            backend,
            _dir: dir,
        }
    }

    /// Number of objects currently stored in the bucket.
    pub fn stored_objects(&self) -> usize {
        count_files(&self.objects.root().join("files"))
    }
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}

/// Undo the HTML escaping of `/` so URLs in rendered pages can be matched.
pub fn unescape_slashes(html: &str) -> String {
    html.replace("&#x2f;", "/").replace("&#x2F;", "/")
}
