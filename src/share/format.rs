//! Presentation helpers: human-readable sizes and per-type icons.

use serde::Serialize;

const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Format a byte count using the Bytes/KB/MB/GB ladder.
///
/// Values are rounded to two decimals with trailing zeros dropped. GB is the
/// top unit, so anything larger is shown as a big GB figure.
///
/// ```
/// use fileshare::share::format::format_file_size;
///
/// assert_eq!(format_file_size(0), "0 Bytes");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    while unit < UNITS.len() - 1 && bytes >= 1024u64.pow(unit as u32 + 1) {
        unit += 1;
    }

    let mut value = round2(bytes as f64 / 1024f64.powi(unit as i32));
    // 1048575 bytes rounds to 1024 KB; show it as 1 MB instead.
    if value >= 1024.0 && unit < UNITS.len() - 1 {
        unit += 1;
        value = round2(bytes as f64 / 1024f64.powi(unit as i32));
    }

    format!("{} {}", trim_decimals(value), UNITS[unit])
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn trim_decimals(value: f64) -> String {
    let s = format!("{value:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Broad category of a file, derived from its MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Video,
    Audio,
    Pdf,
    Archive,
    Document,
    Spreadsheet,
    Other,
}

/// Tile colour for a file kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gradient {
    Blue,
    Purple,
    Green,
    Gray,
}

impl Gradient {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gradient::Blue => "blue",
            Gradient::Purple => "purple",
            Gradient::Green => "green",
            Gradient::Gray => "gray",
        }
    }
}

impl FileKind {
    /// Classify a MIME type. Checks run in a fixed order and the first match wins.
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            FileKind::Image
        } else if mime.starts_with("video/") {
            FileKind::Video
        } else if mime.starts_with("audio/") {
            FileKind::Audio
        } else if mime.contains("pdf") {
            FileKind::Pdf
        } else if mime.contains("zip") || mime.contains("rar") {
            FileKind::Archive
        } else if mime.contains("word") || mime.contains("document") {
            FileKind::Document
        } else if mime.contains("excel") || mime.contains("spreadsheet") {
            FileKind::Spreadsheet
        } else {
            FileKind::Other
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            FileKind::Image => "🖼️",
            FileKind::Video => "🎬",
            FileKind::Audio => "🎵",
            FileKind::Pdf => "📄",
            FileKind::Archive => "🗜️",
            FileKind::Document => "📝",
            FileKind::Spreadsheet => "📊",
            FileKind::Other => "📁",
        }
    }

    pub fn gradient(&self) -> Gradient {
        match self {
            FileKind::Image => Gradient::Blue,
            FileKind::Video => Gradient::Purple,
            FileKind::Audio => Gradient::Green,
            _ => Gradient::Gray,
        }
    }
}

/// Everything a page needs to show one file card.
#[derive(Debug, Clone, Serialize)]
pub struct FileCard {
    pub name: String,
    pub size: String,
    pub icon: &'static str,
    pub gradient: &'static str,
}

impl FileCard {
    pub fn new(name: &str, size: u64, mime: &str) -> Self {
        let kind = FileKind::from_mime(mime);
        Self {
            name: name.to_string(),
            size: format_file_size(size),
            icon: kind.icon(),
            gradient: kind.gradient().as_str(),
        }
    }
}
