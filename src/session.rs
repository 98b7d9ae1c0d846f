use std::path::{Path, PathBuf};

use crate::calibration::{Calibration, Origin};
use crate::data::loader::{self, DATA_EXTENSIONS, LoadOptions};
use crate::data::model::ScratchDataset;
use crate::error::{Error, Result};
use crate::export::{self, IMAGE_EXTENSIONS, MarkerStyle};
use crate::mapper::{PositionMapper, Reading};
use crate::marks::{Mark, MarkId, MarkManager};
use crate::panorama::{self, ScratchImage, StitchOptions};

/// What [`Session::open`] loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opened {
    Image,
    Data,
}

// ---------------------------------------------------------------------------
// Session – one open scratch-test analysis
// ---------------------------------------------------------------------------

/// One image, one force trace, one calibration and the marks placed on them.
///
/// Every user command is a method here; a presentation layer only forwards
/// pointer positions and file paths. Failed loads leave the session as it
/// was.
#[derive(Debug, Clone, Default)]
pub struct Session {
    image: Option<ScratchImage>,
    dataset: Option<ScratchDataset>,
    calibration: Calibration,
    marks: MarkManager,
    data_generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // -- loading --

    /// Open an image or a data file, chosen by extension.
    pub fn open(&mut self, path: &Path, options: &LoadOptions) -> Result<Opened> {
        match file_kind(path) {
            Some(Opened::Image) => self.open_image(path).map(|_| Opened::Image),
            Some(Opened::Data) => self.open_data(path, options).map(|_| Opened::Data),
            None => Err(Error::UnsupportedFile(extension(path))),
        }
    }

    pub fn open_image(&mut self, path: &Path) -> Result<()> {
        let image = panorama::load_image(path)?;
        self.set_image(image);
        Ok(())
    }

    pub fn open_data(&mut self, path: &Path, options: &LoadOptions) -> Result<()> {
        let dataset = loader::load_file(path, options)?;
        self.set_dataset(dataset);
        Ok(())
    }

    /// Stitch a folder of tiles into a panorama and open it, together with
    /// the folder's data file when there is one. Returns where the panorama
    /// was saved.
    pub fn open_folder(
        &mut self,
        dir: &Path,
        stitch: &StitchOptions,
        options: &LoadOptions,
    ) -> Result<PathBuf> {
        let dataset = panorama::folder_data_file(dir)?
            .map(|path| loader::load_file(&path, options))
            .transpose()?;
        let image = panorama::stitch_tiles(dir, stitch.overlap_px, stitch.right_to_left)?;

        let saved = image.path.clone();
        self.set_image(image);
        if let Some(dataset) = dataset {
            self.set_dataset(dataset);
        }
        Ok(saved)
    }

    pub fn set_image(&mut self, image: ScratchImage) {
        self.image = Some(image);
    }

    /// Replace the force data. Existing marks keep their old readings and
    /// become stale.
    pub fn set_dataset(&mut self, dataset: ScratchDataset) {
        self.data_generation += 1;
        if !self.marks.is_empty() {
            log::warn!(
                "force data replaced; {} existing marks keep their previous readings",
                self.marks.len()
            );
        }
        self.dataset = Some(dataset);
    }

    pub fn image(&self) -> Option<&ScratchImage> {
        self.image.as_ref()
    }

    pub fn dataset(&self) -> Option<&ScratchDataset> {
        self.dataset.as_ref()
    }

    // -- calibration --

    /// Put position 0 at this pixel. Existing marks keep their readings and
    /// become stale.
    pub fn define_origin(&mut self, pixel_x: f64, pixel_y: f64, scale: f64) {
        self.calibration.set_origin(pixel_x, pixel_y, scale);
        if !self.marks.is_empty() {
            log::warn!(
                "origin redefined; {} existing marks keep their previous readings",
                self.marks.len()
            );
        }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn origin(&self) -> Option<Origin> {
        self.calibration.origin()
    }

    /// Changes whenever the origin or the force data changes.
    pub fn generation(&self) -> u64 {
        self.calibration.generation() + self.data_generation
    }

    // -- live readout --

    /// Position and force under a pixel.
    pub fn query(&self, pixel_x: f64, pixel_y: f64) -> Result<Reading> {
        if !self.calibration.is_set() {
            return Err(Error::CalibrationNotSet);
        }
        let dataset = self.dataset.as_ref().ok_or(Error::NoData)?;
        PositionMapper::new(&self.calibration, &dataset.forces).query(pixel_x, pixel_y)
    }

    // -- marks --

    /// Mark the pixel with the reading it has right now.
    pub fn mark(&mut self, pixel_x: f64, pixel_y: f64) -> Result<&Mark> {
        let reading = self.query(pixel_x, pixel_y)?;
        let generation = self.generation();
        Ok(self.marks.add(pixel_x, pixel_y, reading, generation))
    }

    pub fn remove_mark(&mut self, id: MarkId) -> Result<Mark> {
        self.marks.remove(id)
    }

    /// Marks in insertion order.
    pub fn marks(&self) -> &[Mark] {
        self.marks.list()
    }

    /// The mark closest to a track position, within `tolerance` µm.
    pub fn mark_near(&self, position: f64, tolerance: f64) -> Option<MarkId> {
        self.marks.nearest(position, tolerance)
    }

    /// Marks resolved before the last origin or data change.
    pub fn stale_marks(&self) -> Vec<&Mark> {
        self.marks.stale(self.generation()).collect()
    }

    pub fn is_stale(&self, mark: &Mark) -> bool {
        mark.generation != self.generation()
    }

    pub fn remove_stale_marks(&mut self) -> usize {
        let removed = self.marks.remove_stale(self.generation());
        if removed > 0 {
            log::info!("removed {removed} stale marks");
        }
        removed
    }

    pub fn clear_marks(&mut self) {
        self.marks.clear();
    }

    // -- saving --

    /// Write the image with marks and origin burned in.
    pub fn save_image(&self, path: &Path, style: &MarkerStyle) -> Result<()> {
        let image = self.image.as_ref().ok_or(Error::NoImage)?;
        export::export_annotated_image(&image.pixels, self.marks(), self.origin(), style, path)
    }

    /// Write `label,position,force` for every mark.
    pub fn save_marks(&self, path: &Path) -> Result<()> {
        export::export_mark_data(self.marks(), path)
    }

    /// Suggested output paths next to the inputs: `<image>_marks.<ext>` and
    /// `<data>_marks.csv`.
    pub fn default_export_paths(&self) -> (Option<PathBuf>, Option<PathBuf>) {
        let image = self.image.as_ref().map(|img| {
            let ext = img
                .path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_else(|| "png".to_string());
            with_suffix(&img.path, "_marks", &ext)
        });
        let data = self
            .dataset
            .as_ref()
            .map(|ds| with_suffix(&ds.path, "_marks", "csv"));
        (image, data)
    }
}

fn with_suffix(path: &Path, suffix: &str, ext: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}{suffix}.{ext}"))
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Whether a path names an image or a data file, by extension.
pub fn file_kind(path: &Path) -> Option<Opened> {
    let ext = extension(path);
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(Opened::Image)
    } else if DATA_EXTENSIONS.contains(&ext.as_str()) {
        Some(Opened::Data)
    } else {
        None
    }
}
