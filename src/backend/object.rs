//! Object storage.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::{Result, ShareError};

/// Cache lifetime in seconds applied to uploaded objects.
pub const DEFAULT_CACHE_CONTROL: &str = "3600";

/// Options for a single object upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// MIME type stored with the object.
    pub content_type: String,
    /// Cache lifetime in seconds.
    pub cache_control: String,
    /// Overwrite an existing object at the same path.
    pub upsert: bool,
}

impl UploadOptions {
    /// Defaults used for shared files: one hour cache, no overwrite.
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            cache_control: DEFAULT_CACHE_CONTROL.to_string(),
            upsert: false,
        }
    }
}

/// A bucketed object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket this store writes to.
    fn bucket(&self) -> &str;

    /// Names of the buckets visible to this store.
    async fn list_buckets(&self) -> Result<Vec<String>>;

    /// Write `data` at `path` inside the bucket.
    async fn upload(&self, path: &str, data: Bytes, options: &UploadOptions) -> Result<()>;

    /// Public URL resolving directly to the object at `path`.
    fn public_url(&self, path: &str) -> String;

    /// Remove the object at `path`. Removing a missing object is not an error.
    async fn remove(&self, path: &str) -> Result<()>;
}

/// Percent-encode each segment of an object path.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Reject object paths that could escape the bucket.
pub fn validate_object_path(path: &str) -> Result<()> {
    if path.is_empty() || path.contains('\\') || path.contains('\0') {
        return Err(ShareError::Validation(format!("invalid object path: {path:?}")));
    }
    for component in Path::new(path).components() {
        match component {
            Component::Normal(_) => {}
            _ => {
                return Err(ShareError::Validation(format!(
                    "invalid object path: {path:?}"
                )))
            }
        }
    }
    if path.split('/').any(str::is_empty) {
        return Err(ShareError::Validation(format!("invalid object path: {path:?}")));
    }
    Ok(())
}

/// Filesystem-backed object store. Buckets are directories under `root`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    bucket: String,
    public_base_url: String,
}

impl LocalObjectStore {
    /// Open the store, creating the bucket directory if needed.
    pub async fn open(
        root: impl Into<PathBuf>,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Result<Self> {
        let store = Self {
            root: root.into(),
            bucket: bucket.into(),
            public_base_url: public_base_url.into(),
        };
        validate_object_path(&store.bucket)?;
        tokio::fs::create_dir_all(store.bucket_dir()).await?;
        Ok(store)
    }

    /// Directory holding all buckets.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self) -> PathBuf {
        self.root.join(&self.bucket)
    }

    fn object_path(&self, path: &str) -> Result<PathBuf> {
        validate_object_path(path)?;
        Ok(self.bucket_dir().join(path))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_buckets(&self) -> Result<Vec<String>> {
        let mut buckets = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                buckets.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        buckets.sort();
        Ok(buckets)
    }

    async fn upload(&self, path: &str, data: Bytes, options: &UploadOptions) -> Result<()> {
        let target = self.object_path(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut open = tokio::fs::OpenOptions::new();
        open.write(true);
        if options.upsert {
            open.create(true).truncate(true);
        } else {
            open.create_new(true);
        }

        let mut file = open.open(&target).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                ShareError::Storage(format!("object already exists: {path}"))
            } else {
                ShareError::Io(e)
            }
        })?;
        file.write_all(&data).await?;
        file.flush().await?;

        debug!(path, size = data.len(), "Stored object");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            encode_path(&self.bucket),
            encode_path(path)
        )
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let target = self.object_path(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        // Drop the per-upload directory once it is empty.
        if let Some(parent) = target.parent() {
            if parent != self.bucket_dir() {
                let _ = tokio::fs::remove_dir(parent).await;
            }
        }
        Ok(())
    }
}
