//! SQLite metadata store.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use super::record::{FileRecord, MetadataStore, NewFileRecord};
use crate::Result;

/// Database migrations, applied in order and recorded in `schema_version`.
pub const MIGRATIONS: &[&str] = &[
    // v1: file metadata
    r#"
CREATE TABLE files (
    id            TEXT PRIMARY KEY,
    download_id   TEXT NOT NULL UNIQUE,
    filename      TEXT NOT NULL,
    filesize      INTEGER NOT NULL,
    file_path     TEXT NOT NULL,
    file_type     TEXT NOT NULL DEFAULT '',
    download_url  TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT
);

CREATE INDEX idx_files_created_at ON files(created_at);
"#,
];

const COLUMNS: &str =
    "id, download_id, filename, filesize, file_path, file_type, download_url, created_at, updated_at";

/// SQLite connection pool with migrations applied.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database file at `path` and migrate it.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening database at {:?}", path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory database");
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Every connection to :memory: is a separate database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the current schema version.
    pub async fn schema_version(&self) -> Result<i64> {
        let table_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        )
        .fetch_one(&self.pool)
        .await?;

        if !table_exists {
            return Ok(0);
        }

        let version: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
                .fetch_one(&self.pool)
                .await?;
        Ok(version)
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        let current_version = self.schema_version().await?;

        if current_version as usize >= MIGRATIONS.len() {
            debug!("Database is up to date (version {})", current_version);
            return Ok(());
        }

        info!(
            "Migrating database from version {} to {}",
            current_version,
            MIGRATIONS.len()
        );

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version     INTEGER PRIMARY KEY,
                applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        for (i, migration) in MIGRATIONS.iter().enumerate().skip(current_version as usize) {
            let version = (i + 1) as i64;
            info!("Applying migration v{}", version);

            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(migration).execute(&mut *tx).await?;
            sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
                .bind(version)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
        }

        Ok(())
    }

    /// Check if a table exists.
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=$1)",
        )
        .bind(table_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

/// [`MetadataStore`] over the `files` table.
#[derive(Debug, Clone)]
pub struct SqliteMetadataStore {
    db: Database,
}

impl SqliteMetadataStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn insert(&self, record: &NewFileRecord) -> Result<FileRecord> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO files ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {COLUMNS}"
        );

        let stored = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&record.download_id)
            .bind(&record.filename)
            .bind(record.filesize)
            .bind(&record.file_path)
            .bind(&record.file_type)
            .bind(&record.download_url)
            .bind(now)
            .bind(now)
            .fetch_one(self.db.pool())
            .await?;

        debug!(download_id = %stored.download_id, "Inserted file record");
        Ok(stored)
    }

    async fn find_by_download_id(&self, download_id: &str) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM files WHERE download_id = $1 LIMIT 1");
        let record = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(download_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(record)
    }

    async fn list_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<FileRecord>> {
        let sql =
            format!("SELECT {COLUMNS} FROM files WHERE created_at < $1 ORDER BY created_at");
        let records = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(cutoff)
            .fetch_all(self.db.pool())
            .await?;
        Ok(records)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
