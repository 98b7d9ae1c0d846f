use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::data::loader::DATA_EXTENSIONS;
use crate::error::{Error, Result};
use crate::export::{IMAGE_EXTENSIONS, write_image};

/// The decoded scratch-track panorama.
#[derive(Debug, Clone)]
pub struct ScratchImage {
    pub path: PathBuf,
    pub format: ImageFormat,
    pub pixels: RgbaImage,
}

impl ScratchImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Whether a pixel coordinate falls on the image.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width() as f64 && y < self.height() as f64
    }
}

/// Decode a panorama from disk.
pub fn load_image(path: &Path) -> Result<ScratchImage> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(Error::UnsupportedFile(ext));
    }

    let reader = image::ImageReader::open(path)
        .map_err(|e| Error::io(path, e))?
        .with_guessed_format()
        .map_err(|e| Error::io(path, e))?;
    let format = reader
        .format()
        .or_else(|| ImageFormat::from_extension(&ext))
        .ok_or_else(|| Error::UnsupportedFile(ext.clone()))?;
    let pixels = reader.decode()?.to_rgba8();

    log::info!(
        "Loaded {}x{} {:?} image from {}",
        pixels.width(),
        pixels.height(),
        format,
        path.display()
    );
    Ok(ScratchImage {
        path: path.to_path_buf(),
        format,
        pixels,
    })
}

// ---------------------------------------------------------------------------
// Tile stitching
// ---------------------------------------------------------------------------

/// Tile formats written by the microscope camera.
pub const TILE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "bmp"];

/// How a folder of tiles is joined into one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchOptions {
    /// Columns shared by neighbouring tiles, in px.
    pub overlap_px: u32,
    /// Tile 1 is the rightmost one.
    pub right_to_left: bool,
}

impl Default for StitchOptions {
    fn default() -> Self {
        Self {
            overlap_px: 200,
            right_to_left: false,
        }
    }
}

/// Join the tiles in `dir` left to right into one panorama, blending each
/// overlap linearly, and save it as [`stitched_path`].
pub fn stitch_tiles(dir: &Path, overlap_px: u32, right_to_left: bool) -> Result<ScratchImage> {
    let paths = tile_paths(dir, right_to_left)?;
    let tiles = paths
        .iter()
        .map(|p| load_image(p).map(|img| img.pixels))
        .collect::<Result<Vec<_>>>()?;
    let pixels = blend_tiles(&tiles, overlap_px).map_err(|reason| Error::stitch(dir, reason))?;

    let out = stitched_path(dir)?;
    write_image(&pixels, &out)?;
    log::info!(
        "Stitched {} tiles from {} into {} ({}x{})",
        tiles.len(),
        dir.display(),
        out.display(),
        pixels.width(),
        pixels.height()
    );
    Ok(ScratchImage {
        path: out,
        format: ImageFormat::Jpeg,
        pixels,
    })
}

/// Tiles of `dir` in placement order, left to right.
///
/// Numbered tiles (`1.jpg`, `2.jpg`, `10.jpg`) sort by number, ahead of any
/// others, which sort by name. With `right_to_left` the first tile is placed
/// rightmost.
pub fn tile_paths(dir: &Path, right_to_left: bool) -> Result<Vec<PathBuf>> {
    let mut tiles = files_with_extension(dir, TILE_EXTENSIONS)?;
    if tiles.is_empty() {
        return Err(Error::stitch(dir, "no .jpg or .bmp tiles"));
    }
    if right_to_left {
        tiles.reverse();
    }
    Ok(tiles)
}

/// The measurement exported alongside the tiles, if any.
pub fn folder_data_file(dir: &Path) -> Result<Option<PathBuf>> {
    Ok(files_with_extension(dir, DATA_EXTENSIONS)?.into_iter().next())
}

/// `<parent>/<data file stem>.jpg`, or `<parent>/<folder name>.jpg` when the
/// folder holds no data file.
pub fn stitched_path(dir: &Path) -> Result<PathBuf> {
    let name = match folder_data_file(dir)? {
        Some(data) => data.file_stem().map(|s| s.to_string_lossy().into_owned()),
        None => dir.file_name().map(|s| s.to_string_lossy().into_owned()),
    }
    .ok_or_else(|| Error::stitch(dir, "cannot name the output"))?;
    let parent = dir.parent().unwrap_or_else(|| Path::new(""));
    Ok(parent.join(format!("{name}.jpg")))
}

fn files_with_extension(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if path.is_file() && extensions.contains(&ext.as_str()) {
            files.push(path);
        }
    }
    files.sort_by_cached_key(|p| natural_key(p));
    Ok(files)
}

fn natural_key(path: &Path) -> (bool, u64, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.parse::<u64>() {
        Ok(n) => (false, n, stem),
        Err(_) => (true, 0, stem),
    }
}

/// Place equally tall tiles in a row, each overlapping the previous one by
/// `overlap_px` columns. Across an overlap the weight moves linearly from
/// the left tile to the right one.
fn blend_tiles(tiles: &[RgbaImage], overlap_px: u32) -> std::result::Result<RgbaImage, String> {
    let Some(first) = tiles.first() else {
        return Err("no tiles".to_string());
    };
    let height = first.height();
    if let Some(odd) = tiles.iter().find(|t| t.height() != height) {
        return Err(format!(
            "tiles must be equally tall ({height} px and {} px)",
            odd.height()
        ));
    }
    let narrowest = tiles.iter().map(|t| t.width()).min().unwrap_or(0);
    if tiles.len() > 1 && overlap_px >= narrowest {
        return Err(format!(
            "overlap of {overlap_px} px leaves nothing of a {narrowest} px wide tile"
        ));
    }

    let joins = tiles.len() as u32 - 1;
    let width = tiles.iter().map(|t| t.width()).sum::<u32>() - overlap_px * joins;
    let mut canvas = RgbaImage::new(width, height);

    let mut left = 0;
    for (i, tile) in tiles.iter().enumerate() {
        let blend = if i == 0 { 0 } else { overlap_px };
        for (x, y, px) in tile.enumerate_pixels() {
            let dst = canvas.get_pixel_mut(left + x, y);
            *dst = if x < blend {
                lerp(*dst, *px, (x + 1) as f32 / (blend + 1) as f32)
            } else {
                *px
            };
        }
        left += tile.width().saturating_sub(overlap_px);
    }
    Ok(canvas)
}

fn lerp(a: Rgba<u8>, b: Rgba<u8>, t: f32) -> Rgba<u8> {
    Rgba(std::array::from_fn(|c| {
        (a[c] as f32 * (1.0 - t) + b[c] as f32 * t).round() as u8
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_png_as_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.png");
        RgbaImage::from_pixel(12, 4, image::Rgba([9, 9, 9, 255]))
            .save(&path)
            .unwrap();

        let img = load_image(&path).unwrap();
        assert_eq!((img.width(), img.height()), (12, 4));
        assert_eq!(img.format, ImageFormat::Png);
        assert!(img.contains(11.5, 3.0));
        assert!(!img.contains(12.0, 0.0));
        assert!(!img.contains(-0.1, 0.0));
    }

    #[test]
    fn rejects_non_raster_extension() {
        let err = load_image(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFile(ext) if ext == "txt"));
    }

    #[test]
    fn corrupt_image_is_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(matches!(load_image(&path), Err(Error::Image(_))));
    }

    fn write_tile(dir: &Path, name: &str, value: u8, width: u32) {
        image::RgbImage::from_pixel(width, 4, image::Rgb([value, value, value]))
            .save(dir.join(name))
            .unwrap();
    }

    fn tile(value: u8, width: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, 2, Rgba([value, value, value, 255]))
    }

    #[test]
    fn overlap_blends_linearly() {
        let out = blend_tiles(&[tile(0, 10), tile(200, 10)], 4).unwrap();
        assert_eq!(out.dimensions(), (16, 2));
        let row: Vec<u8> = (0..16).map(|x| out.get_pixel(x, 1)[0]).collect();
        assert_eq!(
            row,
            vec![0, 0, 0, 0, 0, 0, 40, 80, 120, 160, 200, 200, 200, 200, 200, 200]
        );
        assert_eq!(out.get_pixel(8, 0)[3], 255);
    }

    #[test]
    fn zero_overlap_butts_tiles() {
        let out = blend_tiles(&[tile(10, 3), tile(20, 5)], 0).unwrap();
        assert_eq!(out.dimensions(), (8, 2));
        assert_eq!(out.get_pixel(2, 0)[0], 10);
        assert_eq!(out.get_pixel(3, 0)[0], 20);
    }

    #[test]
    fn rejects_mismatched_tiles() {
        let short = RgbaImage::new(10, 1);
        assert!(blend_tiles(&[tile(0, 10), short], 2).is_err());
        assert!(blend_tiles(&[tile(0, 10), tile(0, 4)], 4).is_err());
        assert!(blend_tiles(&[tile(0, 3)], 8).is_ok());
    }

    #[test]
    fn tiles_sort_by_number_and_direction() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("run");
        std::fs::create_dir(&dir).unwrap();
        write_tile(&dir, "1.bmp", 10, 4);
        write_tile(&dir, "2.bmp", 20, 4);
        write_tile(&dir, "10.bmp", 100, 4);
        std::fs::write(dir.join("notes.txt"), "x").unwrap();

        let names = |paths: Vec<PathBuf>| -> Vec<String> {
            paths
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect()
        };
        assert_eq!(names(tile_paths(&dir, false).unwrap()), ["1.bmp", "2.bmp", "10.bmp"]);
        assert_eq!(names(tile_paths(&dir, true).unwrap()), ["10.bmp", "2.bmp", "1.bmp"]);

        let ltr = stitch_tiles(&dir, 0, false).unwrap();
        assert_eq!((ltr.width(), ltr.height()), (12, 4));
        assert_eq!(ltr.pixels.get_pixel(0, 0)[0], 10);
        assert_eq!(ltr.pixels.get_pixel(11, 0)[0], 100);

        let rtl = stitch_tiles(&dir, 0, true).unwrap();
        assert_eq!(rtl.pixels.get_pixel(0, 0)[0], 100);
        assert_eq!(rtl.pixels.get_pixel(11, 0)[0], 10);
    }

    #[test]
    fn output_is_named_after_the_data_file() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("M1402 tiles");
        std::fs::create_dir(&dir).unwrap();
        write_tile(&dir, "1.jpg", 50, 8);
        write_tile(&dir, "2.jpg", 50, 8);
        assert_eq!(stitched_path(&dir).unwrap(), root.path().join("M1402 tiles.jpg"));

        std::fs::write(dir.join("M1402_5-60_1.csv"), "x,fIn\n").unwrap();
        let expected = root.path().join("M1402_5-60_1.jpg");
        assert_eq!(stitched_path(&dir).unwrap(), expected);

        let img = stitch_tiles(&dir, 2, false).unwrap();
        assert_eq!(img.path, expected);
        assert_eq!(img.format, ImageFormat::Jpeg);
        let saved = image::open(&expected).unwrap();
        assert_eq!((saved.width(), saved.height()), (14, 4));
    }

    #[test]
    fn empty_folder_cannot_be_stitched() {
        let dir = tempfile::tempdir().unwrap();
        let err = stitch_tiles(dir.path(), 0, false).unwrap_err();
        assert!(matches!(err, Error::Stitch { .. }));
    }
}
