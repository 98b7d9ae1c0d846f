use std::str::FromStr;

use image::Rgba;
use palette::{IntoColor, Lab, Srgb};

// ---------------------------------------------------------------------------
// Hex colours from settings
// ---------------------------------------------------------------------------

/// Parse `#RRGGBB` (or `RRGGBB`) into an opaque RGBA pixel.
pub fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    let rgb = Srgb::<u8>::from_str(hex.trim()).ok()?;
    Some(Rgba([rgb.red, rgb.green, rgb.blue, 255]))
}

/// Parse a hex colour, falling back to `default` when it is malformed.
pub fn parse_hex_or(hex: &str, default: Rgba<u8>) -> Rgba<u8> {
    parse_hex(hex).unwrap_or_else(|| {
        log::warn!("invalid colour '{hex}', using default");
        default
    })
}

/// Same colour with a different alpha.
pub fn with_alpha(color: Rgba<u8>, alpha: u8) -> Rgba<u8> {
    let Rgba([r, g, b, _]) = color;
    Rgba([r, g, b, alpha])
}

/// Black for light colours, white for dark ones, so a marker stays visible
/// against the track.
pub fn outline_for(color: Rgba<u8>) -> Rgba<u8> {
    let Rgba([r, g, b, _]) = color;
    let lab: Lab = Srgb::new(r, g, b).into_format::<f32>().into_color();
    if lab.l > 50.0 {
        Rgba([0, 0, 0, 255])
    } else {
        Rgba([255, 255, 255, 255])
    }
}
