//! Configuration module for FileShare.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, ShareError};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origin used when building share links (e.g., "https://share.example.com").
    ///
    /// When unset, the origin is derived from the request headers.
    #[serde(default)]
    pub public_origin: Option<String>,
    /// CORS allowed origins for the JSON API.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_origin: None,
            cors_origins: vec![],
        }
    }
}

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Filesystem objects and SQLite rows.
    #[default]
    Local,
    /// Hosted Supabase-compatible storage and REST API.
    Supabase,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Backend kind.
    #[serde(default)]
    pub kind: BackendKind,
    /// Object storage bucket name.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Metadata table name.
    #[serde(default = "default_table")]
    pub table: String,
    /// Local backend settings.
    #[serde(default)]
    pub local: LocalBackendConfig,
    /// Supabase backend settings.
    #[serde(default)]
    pub supabase: SupabaseConfig,
}

fn default_bucket() -> String {
    "files".to_string()
}

fn default_table() -> String {
    "files".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            bucket: default_bucket(),
            table: default_table(),
            local: LocalBackendConfig::default(),
            supabase: SupabaseConfig::default(),
        }
    }
}

/// Local backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalBackendConfig {
    /// Directory holding bucket directories.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub database_path: String,
    /// Base URL under which stored objects are served.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_storage_path() -> String {
    "data/objects".to_string()
}

fn default_db_path() -> String {
    "data/fileshare.db".to_string()
}

fn default_public_base_url() -> String {
    "/objects".to_string()
}

impl Default for LocalBackendConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            database_path: default_db_path(),
            public_base_url: default_public_base_url(),
        }
    }
}

/// Supabase backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL (e.g., "https://xyzcompany.supabase.co").
    #[serde(default)]
    pub url: String,
    /// API key sent as `apikey` and bearer token.
    #[serde(default)]
    pub key: String,
    /// Total request timeout in seconds.
    #[serde(default = "default_supabase_timeout")]
    pub timeout_secs: u64,
}

fn default_supabase_timeout() -> u64 {
    300
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            key: String::new(),
            timeout_secs: default_supabase_timeout(),
        }
    }
}

/// How upload progress is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    /// Fixed ramp: +10% every 500ms up to 90%.
    Synthetic,
    /// Fraction of request bytes received, capped at 90% until settled.
    #[default]
    Transfer,
}

/// Upload configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_size_mb: u64,
    /// Progress reporting mode.
    #[serde(default)]
    pub progress: ProgressMode,
    /// Remove the stored object when the metadata insert fails.
    #[serde(default)]
    pub cleanup_orphans: bool,
    /// Upload requests allowed per client IP per minute.
    #[serde(default = "default_upload_rate_limit")]
    pub rate_limit_per_minute: u32,
}

fn default_max_upload_size() -> u64 {
    100
}

fn default_upload_rate_limit() -> u32 {
    30
}

impl UploadConfig {
    /// Maximum upload size in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_mb: default_max_upload_size(),
            progress: ProgressMode::default(),
            cleanup_orphans: false,
            rate_limit_per_minute: default_upload_rate_limit(),
        }
    }
}

/// Retention configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Days a file is kept (0 = keep forever).
    #[serde(default)]
    pub days: u32,
    /// Interval between expiry sweeps in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_sweep_interval() -> u64 {
    3600 // 1 hour
}

/// Longest retention accepted by [`Config::validate`] (100 years).
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Largest upload limit accepted by [`Config::validate`] (1 TiB).
pub const MAX_UPLOAD_SIZE_MB: u64 = 1024 * 1024;

impl RetentionConfig {
    /// Whether the expiry sweeper should run.
    pub fn enabled(&self) -> bool {
        self.days > 0
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            days: 0,
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Site information configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Site name shown in the navbar and footer.
    #[serde(default = "default_site_name")]
    pub name: String,
    /// Language code (th / en).
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_site_name() -> String {
    "FileShare".to_string()
}

fn default_language() -> String {
    "th".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            language: default_language(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/fileshare.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Upload configuration.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Retention configuration.
    #[serde(default)]
    pub retention: RetentionConfig,
    /// Site information.
    #[serde(default)]
    pub site: SiteConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ShareError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ShareError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FILESHARE_SUPABASE_URL`: Override the Supabase project URL
    /// - `FILESHARE_SUPABASE_KEY`: Override the Supabase API key
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("FILESHARE_SUPABASE_URL") {
            if !url.is_empty() {
                self.backend.supabase.url = url;
            }
        }

        if let Ok(key) = std::env::var("FILESHARE_SUPABASE_KEY") {
            if !key.is_empty() {
                self.backend.supabase.key = key;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The Supabase backend is selected without a URL or key
    /// - The upload limit is zero or above [`MAX_UPLOAD_SIZE_MB`]
    /// - Retention is enabled with a zero sweep interval or more than
    ///   [`MAX_RETENTION_DAYS`] days
    pub fn validate(&self) -> Result<()> {
        if self.backend.kind == BackendKind::Supabase {
            if self.backend.supabase.url.is_empty() {
                return Err(ShareError::Config(
                    "Supabase backend selected but backend.supabase.url is not set. \
                     Set it in config.toml or via FILESHARE_SUPABASE_URL environment variable."
                        .to_string(),
                ));
            }
            if self.backend.supabase.key.is_empty() {
                return Err(ShareError::Config(
                    "Supabase backend selected but backend.supabase.key is not set. \
                     Set it in config.toml or via FILESHARE_SUPABASE_KEY environment variable."
                        .to_string(),
                ));
            }
        }

        if self.upload.max_size_mb == 0 {
            return Err(ShareError::Config(
                "upload.max_size_mb must be greater than 0".to_string(),
            ));
        }
        if self.upload.max_size_mb > MAX_UPLOAD_SIZE_MB {
            return Err(ShareError::Config(format!(
                "upload.max_size_mb must be at most {MAX_UPLOAD_SIZE_MB}"
            )));
        }

        if self.retention.enabled() {
            if self.retention.days > MAX_RETENTION_DAYS {
                return Err(ShareError::Config(format!(
                    "retention.days must be at most {MAX_RETENTION_DAYS}"
                )));
            }
            if self.retention.sweep_interval_secs == 0 {
                return Err(ShareError::Config(
                    "retention.sweep_interval_secs must be greater than 0 when retention is enabled"
                        .to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert!(config.server.public_origin.is_none());
        assert!(config.server.cors_origins.is_empty());

        assert_eq!(config.backend.kind, BackendKind::Local);
        assert_eq!(config.backend.bucket, "files");
        assert_eq!(config.backend.table, "files");
        assert_eq!(config.backend.local.storage_path, "data/objects");
        assert_eq!(config.backend.local.database_path, "data/fileshare.db");
        assert_eq!(config.backend.local.public_base_url, "/objects");
        assert!(config.backend.supabase.url.is_empty());
        assert_eq!(config.backend.supabase.timeout_secs, 300);

        assert_eq!(config.upload.max_size_mb, 100);
        assert_eq!(config.upload.max_size_bytes(), 100 * 1024 * 1024);
        assert_eq!(config.upload.progress, ProgressMode::Transfer);
        assert!(!config.upload.cleanup_orphans);
        assert_eq!(config.upload.rate_limit_per_minute, 30);

        assert_eq!(config.retention.days, 0);
        assert!(!config.retention.enabled());
        assert_eq!(config.retention.sweep_interval_secs, 3600);

        assert_eq!(config.site.name, "FileShare");
        assert_eq!(config.site.language, "th");

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/fileshare.log");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 3000
public_origin = "https://share.example.com"
cors_origins = ["http://localhost:5173"]

[backend]
kind = "supabase"
bucket = "uploads"
table = "shared_files"

[backend.local]
storage_path = "custom/objects"
database_path = "custom/db.sqlite"
public_base_url = "https://cdn.example.com/objects"

[backend.supabase]
url = "https://xyz.supabase.co"
key = "anon-key"
timeout_secs = 60

[upload]
max_size_mb = 50
progress = "synthetic"
cleanup_orphans = true
rate_limit_per_minute = 5

[retention]
days = 30
sweep_interval_secs = 600

[site]
name = "My Share"
language = "en"

[logging]
level = "debug"
file = "custom/logs/app.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(
            config.server.public_origin.as_deref(),
            Some("https://share.example.com")
        );
        assert_eq!(config.server.cors_origins, vec!["http://localhost:5173"]);

        assert_eq!(config.backend.kind, BackendKind::Supabase);
        assert_eq!(config.backend.bucket, "uploads");
        assert_eq!(config.backend.table, "shared_files");
        assert_eq!(config.backend.local.storage_path, "custom/objects");
        assert_eq!(config.backend.local.database_path, "custom/db.sqlite");
        assert_eq!(
            config.backend.local.public_base_url,
            "https://cdn.example.com/objects"
        );
        assert_eq!(config.backend.supabase.url, "https://xyz.supabase.co");
        assert_eq!(config.backend.supabase.key, "anon-key");
        assert_eq!(config.backend.supabase.timeout_secs, 60);

        assert_eq!(config.upload.max_size_mb, 50);
        assert_eq!(config.upload.progress, ProgressMode::Synthetic);
        assert!(config.upload.cleanup_orphans);
        assert_eq!(config.upload.rate_limit_per_minute, 5);

        assert_eq!(config.retention.days, 30);
        assert!(config.retention.enabled());
        assert_eq!(config.retention.sweep_interval_secs, 600);

        assert_eq!(config.site.name, "My Share");
        assert_eq!(config.site.language, "en");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "custom/logs/app.log");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[server]
port = 9000

[upload]
max_size_mb = 10
"#;

        let config = Config::parse(toml).unwrap();

        // Specified values
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.upload.max_size_mb, 10);

        // Default values
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.backend.kind, BackendKind::Local);
        assert_eq!(config.upload.progress, ProgressMode::Transfer);
        assert_eq!(config.site.language, "th");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.backend.bucket, "files");
        assert_eq!(config.upload.max_size_mb, 100);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        assert!(result.is_err());
        if let Err(ShareError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_parse_unknown_backend_kind() {
        let result = Config::parse("[backend]\nkind = \"ftp\"\n");
        assert!(matches!(result, Err(ShareError::Config(_))));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");

        assert!(matches!(result, Err(ShareError::Io(_))));
    }

    #[test]
    fn test_apply_env_overrides() {
        let original_url = std::env::var("FILESHARE_SUPABASE_URL").ok();
        let original_key = std::env::var("FILESHARE_SUPABASE_KEY").ok();

        std::env::set_var("FILESHARE_SUPABASE_URL", "https://env.supabase.co");
        std::env::set_var("FILESHARE_SUPABASE_KEY", "");

        let mut config = Config::default();
        config.backend.supabase.key = "original-key".to_string();
        config.apply_env_overrides();

        assert_eq!(config.backend.supabase.url, "https://env.supabase.co");
        // Empty values do not override
        assert_eq!(config.backend.supabase.key, "original-key");

        match original_url {
            Some(val) => std::env::set_var("FILESHARE_SUPABASE_URL", val),
            None => std::env::remove_var("FILESHARE_SUPABASE_URL"),
        }
        match original_key {
            Some(val) => std::env::set_var("FILESHARE_SUPABASE_KEY", val),
            None => std::env::remove_var("FILESHARE_SUPABASE_KEY"),
        }
    }

    #[test]
    fn test_validate_supabase_without_url() {
        let mut config = Config::default();
        config.backend.kind = BackendKind::Supabase;
        config.backend.supabase.key = "key".to_string();

        let result = config.validate();
        if let Err(ShareError::Config(msg)) = result {
            assert!(msg.contains("backend.supabase.url"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_validate_supabase_without_key() {
        let mut config = Config::default();
        config.backend.kind = BackendKind::Supabase;
        config.backend.supabase.url = "https://xyz.supabase.co".to_string();

        let result = config.validate();
        if let Err(ShareError::Config(msg)) = result {
            assert!(msg.contains("backend.supabase.key"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_validate_zero_upload_limit() {
        let mut config = Config::default();
        config.upload.max_size_mb = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_huge_upload_limit() {
        let mut config = Config::default();
        config.upload.max_size_mb = u64::MAX;
        assert_eq!(config.upload.max_size_bytes(), u64::MAX);
        assert!(matches!(config.validate(), Err(ShareError::Config(_))));

        config.upload.max_size_mb = MAX_UPLOAD_SIZE_MB;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_retention_zero_interval() {
        let mut config = Config::default();
        config.retention.days = 30;
        config.retention.sweep_interval_secs = 0;

        let result = config.validate();
        if let Err(ShareError::Config(msg)) = result {
            assert!(msg.contains("retention.sweep_interval_secs"));
        } else {
            panic!("Expected Config error");
        }

        // A zero interval is fine while retention is off
        config.retention.days = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_retention_days_out_of_range() {
        let mut config = Config::default();
        config.retention.days = u32::MAX;

        let result = config.validate();
        if let Err(ShareError::Config(msg)) = result {
            assert!(msg.contains("retention.days"));
        } else {
            panic!("Expected Config error");
        }

        config.retention.days = MAX_RETENTION_DAYS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_local_default() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_sample_config_parses() {
        let config = Config::parse(include_str!("../config.toml")).unwrap();
        assert_eq!(config.backend.kind, BackendKind::Local);
        assert_eq!(config.upload.max_size_bytes(), 100 * 1024 * 1024);
        assert_eq!(config.upload.progress, ProgressMode::Transfer);
        assert!(config.validate().is_ok());
    }
}
