//! Internationalization (i18n) module for FileShare.
//!
//! User-facing text lives in TOML catalogs that are compiled into the binary.
//!
//! # Usage
//!
//! ```
//! use fileshare::i18n::I18n;
//!
//! let i18n = I18n::builtin("en").unwrap();
//! assert_eq!(i18n.t("nav.home"), "Home");
//! assert_eq!(
//!     i18n.t_with("upload.too_large_detail", &[("limit", "100MB")]),
//!     "Files must not exceed 100MB"
//! );
//! ```

use std::collections::HashMap;

use thiserror::Error;

/// Default locale.
pub const DEFAULT_LOCALE: &str = "th";

const BUILTIN_LOCALES: &[(&str, &str)] = &[
    ("th", include_str!("../../locales/th.toml")),
    ("en", include_str!("../../locales/en.toml")),
];

/// I18n-related errors.
#[derive(Error, Debug)]
pub enum I18nError {
    /// Failed to parse TOML.
    #[error("Failed to parse locale file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Locale not found.
    #[error("Locale not found: {0}")]
    LocaleNotFound(String),
}

/// Result type for i18n operations.
pub type Result<T> = std::result::Result<T, I18nError>;

/// A loaded message catalog for one locale.
#[derive(Debug, Clone)]
pub struct I18n {
    /// Current locale (e.g., "th", "en").
    locale: String,
    /// Flattened message map (key -> value).
    messages: HashMap<String, String>,
}

impl I18n {
    /// Load one of the catalogs compiled into the binary.
    pub fn builtin(locale: &str) -> Result<Self> {
        BUILTIN_LOCALES
            .iter()
            .find(|(code, _)| *code == locale)
            .ok_or_else(|| I18nError::LocaleNotFound(locale.to_string()))
            .and_then(|(code, content)| Self::from_str(code, content))
    }

    /// Load a built-in catalog, falling back to [`DEFAULT_LOCALE`] for unknown codes.
    pub fn builtin_or_default(locale: &str) -> Self {
        match Self::builtin(locale) {
            Ok(i18n) => i18n,
            Err(e) => {
                tracing::warn!("{e}, falling back to '{DEFAULT_LOCALE}'");
                Self::builtin(DEFAULT_LOCALE).unwrap_or_else(|_| Self::empty(DEFAULT_LOCALE))
            }
        }
    }

    /// Create an I18n instance from a TOML string.
    pub fn from_str(locale: &str, content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content)?;

        let mut messages = HashMap::new();
        flatten_toml("", &toml::Value::Table(table), &mut messages);

        Ok(Self {
            locale: locale.to_string(),
            messages,
        })
    }

    /// Create an empty I18n instance.
    ///
    /// All translations will return the key itself.
    pub fn empty(locale: &str) -> Self {
        Self {
            locale: locale.to_string(),
            messages: HashMap::new(),
        }
    }

    /// Get the current locale.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Get the number of loaded messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if no messages are loaded.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Translate a key. Missing keys translate to the key itself.
    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        self.messages.get(key).map(|s| s.as_str()).unwrap_or(key)
    }

    /// Translate a key with `{{name}}` parameter substitution.
    pub fn t_with(&self, key: &str, params: &[(&str, &str)]) -> String {
        let mut result = self.t(key).to_string();

        for (name, value) in params {
            let placeholder = format!("{{{{{name}}}}}");
            result = result.replace(&placeholder, value);
        }

        result
    }

    /// Check if a translation key exists.
    pub fn has_key(&self, key: &str) -> bool {
        self.messages.contains_key(key)
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::empty(DEFAULT_LOCALE)
    }
}

/// Flatten a TOML value into a HashMap with dot-separated keys.
fn flatten_toml(prefix: &str, value: &toml::Value, map: &mut HashMap<String, String>) {
    match value {
        toml::Value::Table(table) => {
            for (key, val) in table {
                let new_prefix = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_toml(&new_prefix, val, map);
            }
        }
        toml::Value::String(s) => {
            map.insert(prefix.to_string(), s.clone());
        }
        toml::Value::Integer(i) => {
            map.insert(prefix.to_string(), i.to_string());
        }
        toml::Value::Float(f) => {
            map.insert(prefix.to_string(), f.to_string());
        }
        toml::Value::Boolean(b) => {
            map.insert(prefix.to_string(), b.to_string());
        }
        toml::Value::Array(_) => {}
        toml::Value::Datetime(dt) => {
            map.insert(prefix.to_string(), dt.to_string());
        }
    }
}
