use std::path::PathBuf;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Sample – one (position, force) reading
// ---------------------------------------------------------------------------

/// A single force reading along the scratch track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Distance along the track, in µm.
    pub position: f64,
    /// Normal force, in N.
    pub force: f64,
}

impl Sample {
    pub fn new(position: f64, force: f64) -> Self {
        Self { position, force }
    }
}

impl From<(f64, f64)> for Sample {
    fn from((position, force): (f64, f64)) -> Self {
        Self { position, force }
    }
}

// ---------------------------------------------------------------------------
// SignalStore – validated, position-ordered samples
// ---------------------------------------------------------------------------

/// Force-vs-position samples, immutable after [`SignalStore::load`].
///
/// Holds at least two samples with finite values and strictly increasing
/// positions, so every lookup can binary-search without further checks.
#[derive(Debug, Clone)]
pub struct SignalStore {
    samples: Vec<Sample>,
}

impl SignalStore {
    /// Validate and take ownership of an ordered sample sequence.
    pub fn load<I, S>(samples: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Sample>,
    {
        let samples: Vec<Sample> = samples.into_iter().map(Into::into).collect();

        if samples.len() < 2 {
            return Err(Error::MalformedData(format!(
                "need at least 2 samples, got {}",
                samples.len()
            )));
        }
        if let Some(i) = samples
            .iter()
            .position(|s| !s.position.is_finite() || !s.force.is_finite())
        {
            return Err(Error::MalformedData(format!(
                "sample {i} is not numeric: ({}, {})",
                samples[i].position, samples[i].force
            )));
        }
        if let Some(i) = samples
            .windows(2)
            .position(|w| w[1].position <= w[0].position)
        {
            return Err(Error::MalformedData(format!(
                "positions must be strictly increasing: sample {} at {} follows {}",
                i + 1,
                samples[i + 1].position,
                samples[i].position
            )));
        }

        Ok(Self { samples })
    }

    /// Force at `position`, linearly interpolated between the bracketing
    /// samples. Positions outside the sampled range clamp to the nearest
    /// endpoint.
    pub fn force_at(&self, position: f64) -> f64 {
        let first = self.samples[0];
        let last = self.samples[self.samples.len() - 1];

        // Written as a negated comparison so NaN lands here too.
        if !(position > first.position) {
            return first.force;
        }
        if position >= last.position {
            return last.force;
        }

        // First sample strictly past `position`; always in 1..len here.
        let upper = self.samples.partition_point(|s| s.position <= position);
        let a = self.samples[upper - 1];
        let b = self.samples[upper];
        if a.position == position {
            return a.force;
        }

        let t = (position - a.position) / (b.position - a.position);
        a.force + t * (b.force - a.force)
    }

    /// `(min, max)` sampled position.
    pub fn range(&self) -> (f64, f64) {
        (self.samples[0].position, self.samples[self.samples.len() - 1].position)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always `false`: a loaded store holds at least two samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ScratchDataset – everything loaded from one data file
// ---------------------------------------------------------------------------

/// The loaded force data of one scratch test.
#[derive(Debug, Clone)]
pub struct ScratchDataset {
    /// File the trace was loaded from.
    pub path: PathBuf,
    /// Source file name, used as the plot title.
    pub name: String,
    /// Measured normal force (`fIn`) against position.
    pub forces: SignalStore,
    /// Programmed setpoint force (`fSet`), when the file carries one.
    pub setpoint: Option<Vec<Sample>>,
}
