use eframe::egui::{
    self, Align2, Color32, ColorImage, FontId, Pos2, Rect, ScrollArea, Sense, Stroke,
    TextureHandle, TextureOptions, Ui, pos2, vec2,
};

use crate::state::{AppState, Tool};
use crate::ui::to_color32;

const MIN_ZOOM: f32 = 0.02;
const MAX_ZOOM: f32 = 8.0;

// ---------------------------------------------------------------------------
// Viewer state (GPU side)
// ---------------------------------------------------------------------------

/// Texture and zoom of the panorama view.
pub struct ViewerState {
    texture: Option<TextureHandle>,
    /// `AppState::image_revision` the texture was built from.
    revision: u64,
    /// Screen points per image pixel.
    pub zoom: f32,
    /// Recompute `zoom` to fit the viewport on the next frame.
    pub fit: bool,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            texture: None,
            revision: 0,
            zoom: 1.0,
            fit: true,
        }
    }
}

impl ViewerState {
    /// Upload the session image when it changed since the last frame.
    fn sync_texture(&mut self, ctx: &egui::Context, state: &AppState) {
        if self.revision == state.image_revision && self.texture.is_some() {
            return;
        }
        let Some(img) = state.session.image() else {
            self.texture = None;
            return;
        };

        // Panoramas can be wider than the GPU allows; the texture is only a
        // preview, pixel coordinates always refer to the full image.
        let max_side = ctx.input(|i| i.max_texture_side) as u32;
        let pixels = if img.width() > max_side || img.height() > max_side {
            let f = max_side as f64 / img.width().max(img.height()) as f64;
            let w = ((img.width() as f64 * f) as u32).max(1);
            let h = ((img.height() as f64 * f) as u32).max(1);
            log::debug!("downscaling preview to {w}x{h}");
            image::imageops::thumbnail(&img.pixels, w, h)
        } else {
            img.pixels.clone()
        };

        let color_image = ColorImage::from_rgba_unmultiplied(
            [pixels.width() as usize, pixels.height() as usize],
            pixels.as_raw(),
        );
        self.texture = Some(ctx.load_texture("panorama", color_image, TextureOptions::LINEAR));
        self.revision = state.image_revision;
        self.fit = true;
    }
}

// ---------------------------------------------------------------------------
// Panorama view (central panel)
// ---------------------------------------------------------------------------

/// Render the panorama with origin, marks and the cursor line.
pub fn image_view(ui: &mut Ui, state: &mut AppState, viewer: &mut ViewerState) {
    viewer.sync_texture(ui.ctx(), state);

    let (texture_id, image_size) = match (&viewer.texture, state.session.image()) {
        (Some(tex), Some(img)) => (tex.id(), vec2(img.width() as f32, img.height() as f32)),
        _ => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Drop an image and a CSV here  (File → Open…)");
            });
            return;
        }
    };

    if viewer.fit {
        let avail = ui.available_size();
        viewer.zoom = (avail.y / image_size.y).clamp(MIN_ZOOM, MAX_ZOOM);
        viewer.fit = false;
    }

    ScrollArea::both()
        .id_salt("panorama_scroll")
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            let size = image_size * viewer.zoom;
            let (rect, response) = ui.allocate_exact_size(size, Sense::click());
            let painter = ui.painter_at(rect);
            painter.image(
                texture_id,
                rect,
                Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                Color32::WHITE,
            );

            let to_screen = |x: f64, y: f64| -> Pos2 {
                pos2(
                    rect.min.x + x as f32 * viewer.zoom,
                    rect.min.y + y as f32 * viewer.zoom,
                )
            };
            let to_pixel = |p: Pos2| -> (f64, f64) {
                (
                    ((p.x - rect.min.x) / viewer.zoom) as f64,
                    ((p.y - rect.min.y) / viewer.zoom) as f64,
                )
            };

            let style = state.settings.markers.style();

            // ---- Origin ----
            if let Some(o) = state.session.origin() {
                painter.circle_filled(
                    to_screen(o.x, o.y),
                    style.origin_radius as f32 * viewer.zoom,
                    to_color32(style.origin_color),
                );
            }

            // ---- Marks ----
            let mark_color = to_color32(style.mark_color);
            for mark in state.session.marks() {
                let color = if state.session.is_stale(mark) {
                    Color32::GRAY
                } else {
                    mark_color
                };
                let p = to_screen(mark.pixel_x, mark.pixel_y);
                painter.line_segment(
                    [pos2(p.x, rect.min.y), pos2(p.x, rect.max.y)],
                    Stroke::new(1.5, color.gamma_multiply(0.7)),
                );
                painter.circle_filled(p, (style.mark_radius as f32 * viewer.zoom).max(3.0), color);
                painter.text(
                    p + vec2(6.0, -6.0),
                    Align2::LEFT_BOTTOM,
                    &mark.label,
                    FontId::proportional(13.0),
                    color,
                );
            }

            // ---- Pointer ----
            let hovered_pixel = response
                .hover_pos()
                .map(to_pixel)
                .filter(|&(x, y)| state.session.image().is_some_and(|img| img.contains(x, y)));
            state.hover(hovered_pixel);

            if let (Some(p), Tool::Mark) = (response.hover_pos(), state.tool) {
                painter.line_segment(
                    [pos2(p.x, rect.min.y), pos2(p.x, rect.max.y)],
                    Stroke::new(1.0, Color32::LIGHT_GRAY),
                );
            }

            if response.clicked() || response.secondary_clicked() {
                if let Some((x, y)) = response.interact_pointer_pos().map(to_pixel) {
                    state.click(x, y);
                }
            }

            if response.hovered() {
                let zoom_delta = ui.input(|i| i.zoom_delta());
                if zoom_delta != 1.0 {
                    viewer.zoom = (viewer.zoom * zoom_delta).clamp(MIN_ZOOM, MAX_ZOOM);
                }
            }
        });

    let cursor = match state.tool {
        Tool::Inspect => egui::CursorIcon::Default,
        Tool::SetOrigin | Tool::Mark => egui::CursorIcon::Crosshair,
    };
    if ui.ui_contains_pointer() {
        ui.ctx().set_cursor_icon(cursor);
    }
}
