use crate::calibration::Calibration;
use crate::data::model::SignalStore;
use crate::error::Result;

/// A live (position, force) readout for one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Position along the track, in µm.
    pub position: f64,
    /// Perpendicular offset from the origin, in µm.
    pub offset: f64,
    /// Interpolated force, in N.
    pub force: f64,
}

/// Translates pixel coordinates into force readings.
///
/// Called on every pointer move, so a lookup is one subtraction plus a
/// binary search over the samples.
#[derive(Debug, Clone, Copy)]
pub struct PositionMapper<'a> {
    calibration: &'a Calibration,
    signal: &'a SignalStore,
}

impl<'a> PositionMapper<'a> {
    pub fn new(calibration: &'a Calibration, signal: &'a SignalStore) -> Self {
        Self {
            calibration,
            signal,
        }
    }

    pub fn query(&self, pixel_x: f64, pixel_y: f64) -> Result<Reading> {
        let (position, offset) = self.calibration.to_physical_offset(pixel_x, pixel_y)?;
        Ok(Reading {
            position,
            offset,
            force: self.signal.force_at(position),
        })
    }
}
