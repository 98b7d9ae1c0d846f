pub mod panels;
pub mod plot;
pub mod viewer;

use eframe::egui::Color32;

/// Convert an export colour into its on-screen counterpart.
pub fn to_color32(c: image::Rgba<u8>) -> Color32 {
    Color32::from_rgba_unmultiplied(c[0], c[1], c[2], c[3])
}
