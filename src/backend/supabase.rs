//! Client for a Supabase-compatible hosted backend.
//!
//! Objects go through the Storage API (`/storage/v1`) and metadata rows
//! through PostgREST (`/rest/v1`). Every request carries the project key as
//! both `apikey` and bearer token.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::object::{encode_path, ObjectStore, UploadOptions};
use super::record::{FileRecord, MetadataStore, NewFileRecord};
use crate::config::SupabaseConfig;
use crate::{Result, ShareError};

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// User agent string for backend calls.
const USER_AGENT: &str = concat!("fileshare/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct Bucket {
    name: String,
}

/// Which half of the backend a failed call belongs to.
#[derive(Clone, Copy)]
enum Api {
    Storage,
    Rest,
}

impl Api {
    fn error(self, message: String) -> ShareError {
        match self {
            Api::Storage => ShareError::Storage(message),
            Api::Rest => ShareError::Database(message),
        }
    }
}

/// Supabase-compatible storage and table client.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    bucket: String,
    table: String,
}

impl SupabaseClient {
    /// Build a client from configuration.
    pub fn new(config: &SupabaseConfig, bucket: &str, table: &str) -> Result<Self> {
        let parsed = url::Url::parse(&config.url)
            .map_err(|e| ShareError::Config(format!("invalid backend.supabase.url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ShareError::Config(format!(
                "backend.supabase.url must be http or https, got {}",
                parsed.scheme()
            )));
        }

        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(&config.key)
            .map_err(|e| ShareError::Config(format!("invalid backend.supabase.key: {e}")))?;
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.key))
            .map_err(|e| ShareError::Config(format!("invalid backend.supabase.key: {e}")))?;
        key.set_sensitive(true);
        bearer.set_sensitive(true);
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| ShareError::Http(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            table: table.to_string(),
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            encode_path(&self.bucket),
            encode_path(path)
        )
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, encode_path(&self.table))
    }

    /// Turn a non-success response into an error carrying the response body.
    async fn check(response: Response, api: Api, action: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(api.error(format!("{action} failed: HTTP {status}: {body}")))
    }

    async fn fetch_rows(&self, query: &[(&str, String)]) -> Result<Vec<FileRecord>> {
        let response = self.client.get(self.table_url()).query(query).send().await?;
        let rows = Self::check(response, Api::Rest, "select")
            .await?
            .json::<Vec<FileRecord>>()
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl ObjectStore for SupabaseClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_buckets(&self) -> Result<Vec<String>> {
        let url = format!("{}/storage/v1/bucket", self.base_url);
        let response = self.client.get(url).send().await?;
        let buckets = Self::check(response, Api::Storage, "list buckets")
            .await?
            .json::<Vec<Bucket>>()
            .await?;
        Ok(buckets.into_iter().map(|b| b.name).collect())
    }

    async fn upload(&self, path: &str, data: Bytes, options: &UploadOptions) -> Result<()> {
        let size = data.len();
        let response = self
            .client
            .post(self.object_url(path))
            .header(CONTENT_TYPE, &options.content_type)
            .header(CACHE_CONTROL, format!("max-age={}", options.cache_control))
            .header("x-upsert", options.upsert.to_string())
            .body(data)
            .send()
            .await?;
        Self::check(response, Api::Storage, "upload").await?;

        debug!(path, size, "Uploaded object");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            encode_path(&self.bucket),
            encode_path(path)
        )
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let response = self.client.delete(self.object_url(path)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response, Api::Storage, "remove").await?;
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for SupabaseClient {
    async fn insert(&self, record: &NewFileRecord) -> Result<FileRecord> {
        let response = self
            .client
            .post(self.table_url())
            .header("Prefer", "return=representation")
            .json(&[record])
            .send()
            .await?;
        let mut rows = Self::check(response, Api::Rest, "insert")
            .await?
            .json::<Vec<FileRecord>>()
            .await?;

        if rows.is_empty() {
            return Err(ShareError::Database(
                "insert returned no representation".to_string(),
            ));
        }
        Ok(rows.swap_remove(0))
    }

    async fn find_by_download_id(&self, download_id: &str) -> Result<Option<FileRecord>> {
        let rows = self
            .fetch_rows(&[
                ("select", "*".to_string()),
                ("download_id", format!("eq.{download_id}")),
                ("limit", "1".to_string()),
            ])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<FileRecord>> {
        self.fetch_rows(&[
            ("select", "*".to_string()),
            (
                "created_at",
                format!("lt.{}", cutoff.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ),
            ("order", "created_at.asc".to_string()),
        ])
        .await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let response = self
            .client
            .delete(self.table_url())
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let rows = Self::check(response, Api::Rest, "delete")
            .await?
            .json::<Vec<serde_json::Value>>()
            .await?;
        Ok(!rows.is_empty())
    }
}
