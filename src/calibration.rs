use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Origin – the pixel that sits at position 0
// ---------------------------------------------------------------------------

/// The user-picked zero of the track axis and the image scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Origin {
    pub x: f64,
    pub y: f64,
    /// Length per pixel, in µm.
    pub scale: f64,
}

// ---------------------------------------------------------------------------
// Calibration – pixel → physical mapping
// ---------------------------------------------------------------------------

/// Maps image pixels onto the physical scratch axis.
///
/// The track is assumed to run horizontally across the panorama, so only the
/// x offset from the origin contributes to the track position.
#[derive(Debug, Clone, Default)]
pub struct Calibration {
    origin: Option<Origin>,
    generation: u64,
}

impl Calibration {
    /// Record a new origin, replacing any previous one.
    pub fn set_origin(&mut self, pixel_x: f64, pixel_y: f64, scale: f64) {
        self.origin = Some(Origin {
            x: pixel_x,
            y: pixel_y,
            scale,
        });
        self.generation += 1;
        log::debug!(
            "origin set at ({pixel_x:.1}, {pixel_y:.1}) px, {scale} µm/px (generation {})",
            self.generation
        );
    }

    pub fn origin(&self) -> Option<Origin> {
        self.origin
    }

    pub fn is_set(&self) -> bool {
        self.origin.is_some()
    }

    /// Bumped on every [`set_origin`](Self::set_origin); zero while unset.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Track position of a pixel: `(pixel_x - origin_x) * scale`.
    pub fn to_physical_position(&self, pixel_x: f64, _pixel_y: f64) -> Result<f64> {
        let o = self.origin.ok_or(Error::CalibrationNotSet)?;
        Ok((pixel_x - o.x) * o.scale)
    }

    /// Offset of a pixel from the origin along both image axes, in µm.
    pub fn to_physical_offset(&self, pixel_x: f64, pixel_y: f64) -> Result<(f64, f64)> {
        let o = self.origin.ok_or(Error::CalibrationNotSet)?;
        Ok(((pixel_x - o.x) * o.scale, (pixel_y - o.y) * o.scale))
    }

    /// Inverse of [`to_physical_position`](Self::to_physical_position) along x.
    pub fn to_pixel_x(&self, position: f64) -> Result<f64> {
        let o = self.origin.ok_or(Error::CalibrationNotSet)?;
        Ok(o.x + position / o.scale)
    }
}
