//! QR code rendering for share links.

use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};

use crate::Result;

/// Smallest rendered edge in pixels.
pub const MIN_SIZE: u32 = 200;

/// Render `url` as an SVG QR code with high error correction and a quiet zone.
pub fn render_svg(url: &str) -> Result<String> {
    let code = QrCode::with_error_correction_level(url.as_bytes(), EcLevel::H)?;

    let image = code
        .render::<svg::Color<'_>>()
        .min_dimensions(MIN_SIZE, MIN_SIZE)
        .quiet_zone(true)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShareError;

    #[test]
    fn test_render_svg() {
        let svg = render_svg("https://share.example.com/download/8f1c2a").unwrap();

        assert!(svg.contains("<svg"));
        assert!(svg.contains("#000000"));
    }

    #[test]
    fn test_render_svg_min_size() {
        let svg = render_svg("x").unwrap();

        let width: u32 = svg
            .split("width=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .and_then(|w| w.parse().ok())
            .unwrap();
        assert!(width >= MIN_SIZE);
    }

    #[test]
    fn test_render_svg_too_long() {
        let result = render_svg(&"a".repeat(8_000));
        assert!(matches!(result, Err(ShareError::Qr(_))));
    }
}
