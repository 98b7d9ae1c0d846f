use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::buffer::ConvertBuffer;
use image::{ImageFormat, Pixel, RgbImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::calibration::Origin;
use crate::color::{outline_for, with_alpha};
use crate::error::{Error, Result};
use crate::marks::Mark;

/// Raster formats the exporter can write. Matches what the loader decodes.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

// ---------------------------------------------------------------------------
// Marker style
// ---------------------------------------------------------------------------

/// How marks and the origin are burned into the exported image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    pub mark_color: Rgba<u8>,
    pub origin_color: Rgba<u8>,
    /// Disc radius at each mark, in px.
    pub mark_radius: u32,
    /// Disc radius at the origin, in px.
    pub origin_radius: u32,
    /// Width of the vertical line through each mark, in px. 0 disables it.
    pub line_width: u32,
    /// Opacity of the vertical line.
    pub line_alpha: u8,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            mark_color: Rgba([255, 209, 65, 255]),
            origin_color: Rgba([255, 209, 65, 255]),
            mark_radius: 8,
            origin_radius: 25,
            line_width: 2,
            line_alpha: 180,
        }
    }
}

// ---------------------------------------------------------------------------
// Annotated image
// ---------------------------------------------------------------------------

/// Burn marks (and the origin, when given) into a copy of `image`.
pub fn render_annotations(
    image: &RgbaImage,
    marks: &[Mark],
    origin: Option<Origin>,
    style: &MarkerStyle,
) -> RgbaImage {
    let mut canvas = image.clone();

    if let Some(o) = origin {
        fill_disc(&mut canvas, o.x, o.y, style.origin_radius as f64, style.origin_color);
    }

    let line_color = with_alpha(style.mark_color, style.line_alpha);
    let outline = outline_for(style.mark_color);
    for mark in marks {
        vertical_line(&mut canvas, mark.pixel_x, style.line_width, line_color);
        let r = style.mark_radius as f64;
        fill_disc(&mut canvas, mark.pixel_x, mark.pixel_y, r + 1.5, outline);
        fill_disc(&mut canvas, mark.pixel_x, mark.pixel_y, r, style.mark_color);
    }

    canvas
}

/// Render and write the annotated image. The format follows the extension of
/// `path`; nothing is left at `path` if any step fails.
pub fn export_annotated_image(
    image: &RgbaImage,
    marks: &[Mark],
    origin: Option<Origin>,
    style: &MarkerStyle,
    path: &Path,
) -> Result<()> {
    image_format_for(path)?;
    let canvas = render_annotations(image, marks, origin, style);
    write_image(&canvas, path)?;

    log::info!("Saved annotated image with {} marks to {}", marks.len(), path.display());
    Ok(())
}

/// Encode `image` in the format named by the extension of `path` and write it
/// atomically.
pub(crate) fn write_image(image: &RgbaImage, path: &Path) -> Result<()> {
    let format = image_format_for(path)?;
    write_atomic(path, |file| {
        let mut writer = BufWriter::new(file);
        match format {
            // JPEG has no alpha channel.
            ImageFormat::Jpeg => {
                let rgb: RgbImage = image.convert();
                rgb.write_to(&mut writer, format)?;
            }
            _ => image.write_to(&mut writer, format)?,
        }
        writer.flush().map_err(|e| Error::io(path, e))
    })
}

fn image_format_for(path: &Path) -> Result<ImageFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(Error::UnsupportedFile(ext));
    }
    ImageFormat::from_extension(&ext).ok_or(Error::UnsupportedFile(ext))
}

fn fill_disc(img: &mut RgbaImage, cx: f64, cy: f64, radius: f64, color: Rgba<u8>) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || radius <= 0.0 {
        return;
    }
    let x0 = (cx - radius).floor().max(0.0) as u32;
    let y0 = (cy - radius).floor().max(0.0) as u32;
    let x1 = ((cx + radius).ceil().max(0.0) as u32).min(w - 1);
    let y1 = ((cy + radius).ceil().max(0.0) as u32).min(h - 1);
    let r2 = radius * radius;

    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            if dx * dx + dy * dy <= r2 {
                paint(img.get_pixel_mut(x, y), color);
            }
        }
    }
}

fn vertical_line(img: &mut RgbaImage, cx: f64, width: u32, color: Rgba<u8>) {
    let (w, h) = img.dimensions();
    if width == 0 || w == 0 {
        return;
    }
    let start = (cx - width as f64 / 2.0).round();
    for i in 0..width {
        let x = start + i as f64;
        if x < 0.0 || x >= w as f64 {
            continue;
        }
        for y in 0..h {
            paint(img.get_pixel_mut(x as u32, y), color);
        }
    }
}

fn paint(px: &mut Rgba<u8>, color: Rgba<u8>) {
    if color[3] == u8::MAX {
        *px = color;
    } else {
        px.blend(&color);
    }
}

// ---------------------------------------------------------------------------
// Mark data
// ---------------------------------------------------------------------------

/// One row of the mark data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkRecord {
    pub label: String,
    /// µm
    pub position: f64,
    /// N
    pub force: f64,
}

impl From<&Mark> for MarkRecord {
    fn from(m: &Mark) -> Self {
        Self {
            label: m.label.clone(),
            position: m.position,
            force: m.force,
        }
    }
}

/// Write `label,position,force` rows in mark order, atomically.
pub fn export_mark_data(marks: &[Mark], path: &Path) -> Result<()> {
    write_atomic(path, |file| {
        let mut writer = csv::Writer::from_writer(BufWriter::new(file));
        for mark in marks {
            writer
                .serialize(MarkRecord::from(mark))
                .map_err(|e| Error::io(path, e.into()))?;
        }
        // The header comes from the first serialized record.
        if marks.is_empty() {
            writer
                .write_record(["label", "position", "force"])
                .map_err(|e| Error::io(path, e.into()))?;
        }
        writer.flush().map_err(|e| Error::io(path, e))
    })?;

    log::info!("Saved {} marks to {}", marks.len(), path.display());
    Ok(())
}

/// Read a mark data file written by [`export_mark_data`].
pub fn read_mark_data(path: &Path) -> Result<Vec<MarkRecord>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    csv::Reader::from_reader(file)
        .into_deserialize::<MarkRecord>()
        .enumerate()
        .map(|(row, rec)| rec.map_err(|e| Error::MalformedData(format!("row {row}: {e}"))))
        .collect()
}

// ---------------------------------------------------------------------------
// Atomic write
// ---------------------------------------------------------------------------

/// Write through a temp file in the destination directory, then rename it
/// over `path`. The temp file is deleted if `write` fails.
pub(crate) fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(path, e))?;
    write(tmp.as_file_mut())?;
    tmp.as_file().sync_all().map_err(|e| Error::io(path, e))?;
    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(id: u64, x: f64, y: f64, position: f64, force: f64) -> Mark {
        Mark {
            id: crate::marks::MarkId(id),
            label: id.to_string(),
            pixel_x: x,
            pixel_y: y,
            position,
            force,
            generation: 1,
        }
    }

    fn gray(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([40, 40, 40, 255]))
    }

    #[test]
    fn burns_marks_and_origin() {
        let style = MarkerStyle::default();
        let origin = Origin {
            x: 30.0,
            y: 30.0,
            scale: 1.0,
        };
        let marks = [mark(1, 70.0, 20.0, 40.0, 1.0)];
        let out = render_annotations(&gray(100, 60), &marks, Some(origin), &style);

        assert_eq!(*out.get_pixel(30, 30), style.origin_color);
        assert_eq!(*out.get_pixel(70, 20), style.mark_color);
        // The line spans the full height, away from the disc too.
        assert_ne!(*out.get_pixel(70, 55), Rgba([40, 40, 40, 255]));
        assert_eq!(*out.get_pixel(5, 55), Rgba([40, 40, 40, 255]));
    }

    #[test]
    fn markers_near_edges_are_clipped() {
        let style = MarkerStyle::default();
        let marks = [mark(1, -3.0, 12.0, 0.0, 0.0), mark(2, 9.5, 0.0, 0.0, 0.0)];
        let out = render_annotations(&gray(10, 10), &marks, None, &style);
        assert_eq!(out.dimensions(), (10, 10));
    }

    #[test]
    fn writes_png_and_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let marks = [mark(1, 5.0, 5.0, 1.0, 1.0)];
        for name in ["out.png", "out.jpg", "out.bmp"] {
            let path = dir.path().join(name);
            export_annotated_image(&gray(16, 16), &marks, None, &MarkerStyle::default(), &path)
                .unwrap();
            let back = image::open(&path).unwrap();
            assert_eq!((back.width(), back.height()), (16, 16));
        }
    }

    #[test]
    fn unsupported_extension_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tiff");
        let err = export_annotated_image(&gray(4, 4), &[], None, &MarkerStyle::default(), &path)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFile(_)));
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("marks.csv");
        let err = export_mark_data(&[mark(1, 0.0, 0.0, 1.0, 1.0)], &path).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn mark_data_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marks.csv");
        let marks = [
            mark(1, 0.0, 0.0, 12.345678901234, 0.1),
            mark(3, 0.0, 0.0, -0.5, 17.000000000000004),
        ];
        export_mark_data(&marks, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("label,position,force\n"));

        let back = read_mark_data(&path).unwrap();
        let expected: Vec<MarkRecord> = marks.iter().map(MarkRecord::from).collect();
        assert_eq!(back, expected);
    }

    #[test]
    fn empty_mark_export_has_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marks.csv");
        export_mark_data(&[], &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "label,position,force\n");
        assert!(read_mark_data(&path).unwrap().is_empty());
    }

    #[test]
    fn export_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marks.csv");
        std::fs::write(&path, "stale").unwrap();
        export_mark_data(&[mark(1, 0.0, 0.0, 1.0, 2.0)], &path).unwrap();
        assert_eq!(read_mark_data(&path).unwrap().len(), 1);
    }
}
