//! Server-side page rendering.

use std::sync::Arc;

use minijinja::value::{Kwargs, Value};
use minijinja::Environment;
use serde::Serialize;

use crate::i18n::I18n;
use crate::share::format_file_size;
use crate::Result;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("partials.html", include_str!("../../templates/partials.html")),
    ("home.html", include_str!("../../templates/home.html")),
    ("upload.html", include_str!("../../templates/upload.html")),
    ("download.html", include_str!("../../templates/download.html")),
    ("not_found.html", include_str!("../../templates/not_found.html")),
];

/// Retention shown on the landing page when no expiry is configured.
const ADVERTISED_RETENTION_DAYS: u32 = 30;

/// Site-wide values every page can use.
#[derive(Debug, Clone, Serialize)]
pub struct SiteInfo {
    pub name: String,
    pub lang: String,
    /// Upload limit in bytes.
    pub max_size: u64,
    /// Upload limit for display, e.g. "100MB".
    pub max_size_label: String,
    pub retention_days: u32,
    pub year: i32,
}

impl SiteInfo {
    pub fn new(name: &str, lang: &str, max_size: u64, retention_days: u32) -> Self {
        let retention_days = if retention_days == 0 {
            ADVERTISED_RETENTION_DAYS
        } else {
            retention_days
        };
        Self {
            name: name.to_string(),
            lang: lang.to_string(),
            max_size,
            max_size_label: format_file_size(max_size).replace(' ', ""),
            retention_days,
            year: chrono::Datelike::year(&chrono::Utc::now()),
        }
    }
}

/// Template environment with translations and site globals installed.
pub struct Views {
    env: Environment<'static>,
}

impl Views {
    pub fn new(i18n: Arc<I18n>, site: SiteInfo) -> Result<Self> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }

        env.add_global("site", Value::from_serialize(&site));
        env.add_function(
            "t",
            move |key: String, kwargs: Kwargs| -> std::result::Result<String, minijinja::Error> {
                let mut params = Vec::new();
                for name in kwargs.args() {
                    let value: Value = kwargs.get(name)?;
                    params.push((name.to_string(), value.to_string()));
                }
                let params: Vec<(&str, &str)> = params
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                Ok(i18n.t_with(&key, &params))
            },
        );

        Ok(Self { env })
    }

    /// Render a page template with `ctx`.
    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String> {
        let template = self.env.get_template(name)?;
        Ok(template.render(ctx)?)
    }
}

impl std::fmt::Debug for Views {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Views").finish()
    }
}
