use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RawTrace – columns as read from the instrument export
// ---------------------------------------------------------------------------

/// Column data of one instrument export, before or after normalisation.
/// All vectors have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTrace {
    pub position: Vec<f64>,
    pub force: Vec<f64>,
    pub setpoint: Option<Vec<f64>>,
}

impl RawTrace {
    pub fn len(&self) -> usize {
        self.position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Normalisation settings
// ---------------------------------------------------------------------------

/// How raw instrument columns become µm / N.
///
/// Defaults match the scratch tester's export: positions in encoder counts
/// (25.6 per µm), forces in mN, and an approach segment logged at position 0
/// before the tip starts moving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Normalization {
    /// Negate positions when the track was logged in the negative direction.
    pub fix_sign: bool,
    /// Drop the approach/stabilisation rows logged at position 0.
    pub trim_approach: bool,
    /// Raw position units per µm.
    pub position_divisor: f64,
    /// Raw force units per N.
    pub force_divisor: f64,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            fix_sign: true,
            trim_approach: true,
            position_divisor: 25.6,
            force_divisor: 1000.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Apply the enabled normalisation steps, in order: sign fix, approach trim,
/// unit conversion.
pub fn normalize(mut trace: RawTrace, norm: &Normalization) -> RawTrace {
    if norm.fix_sign && mean(&trace.position).is_some_and(|m| m < -1.0) {
        log::debug!("positions run negative, flipping sign");
        for p in &mut trace.position {
            *p = -*p;
        }
    }

    if norm.trim_approach {
        // Keep only the last of the rows logged at the origin.
        let zeros = trace.position.iter().filter(|&&p| p == 0.0).count();
        let drop = zeros.saturating_sub(1);
        if drop > 0 {
            log::debug!("trimming {drop} approach rows");
            trace.position.drain(..drop);
            trace.force.drain(..drop);
            if let Some(sp) = &mut trace.setpoint {
                sp.drain(..drop);
            }
        }
    }

    scale(&mut trace.position, norm.position_divisor);
    scale(&mut trace.force, norm.force_divisor);
    if let Some(sp) = &mut trace.setpoint {
        scale(sp, norm.force_divisor);
    }

    trace
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn scale(values: &mut [f64], divisor: f64) {
    if divisor == 1.0 {
        return;
    }
    for v in values {
        *v /= divisor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn identity_units() -> Normalization {
        Normalization {
            position_divisor: 1.0,
            force_divisor: 1.0,
            ..Normalization::default()
        }
    }

    #[test]
    fn trims_all_but_last_approach_row() {
        let trace = RawTrace {
            position: vec![0.0, 0.0, 0.0, 1.0, 2.0],
            force: vec![5.0, 6.0, 7.0, 8.0, 9.0],
            setpoint: Some(vec![1.0, 1.0, 1.0, 2.0, 3.0]),
        };
        let out = normalize(trace, &identity_units());
        assert_eq!(out.position, vec![0.0, 1.0, 2.0]);
        assert_eq!(out.force, vec![7.0, 8.0, 9.0]);
        assert_eq!(out.setpoint, Some(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn flips_negative_going_tracks() {
        let trace = RawTrace {
            position: vec![0.0, -10.0, -20.0],
            force: vec![1.0, 2.0, 3.0],
            setpoint: None,
        };
        let out = normalize(trace, &identity_units());
        assert_eq!(out.position, vec![0.0, 10.0, 20.0]);
    }

    #[test]
    fn leaves_slightly_negative_mean_alone() {
        let trace = RawTrace {
            position: vec![-1.0, -0.5, 0.5],
            force: vec![1.0, 2.0, 3.0],
            setpoint: None,
        };
        let out = normalize(trace.clone(), &identity_units());
        assert_eq!(out.position, trace.position);
    }

    #[test]
    fn converts_units() {
        let trace = RawTrace {
            position: vec![0.0, 25.6, 51.2],
            force: vec![0.0, 1000.0, 2500.0],
            setpoint: Some(vec![500.0, 1000.0, 1500.0]),
        };
        let out = normalize(trace, &Normalization::default());
        assert_relative_eq!(out.position[1], 1.0);
        assert_relative_eq!(out.position[2], 2.0);
        assert_relative_eq!(out.force[2], 2.5);
        assert_relative_eq!(out.setpoint.unwrap()[0], 0.5);
    }

    #[test]
    fn disabled_steps_are_skipped() {
        let trace = RawTrace {
            position: vec![0.0, 0.0, -30.0],
            force: vec![1.0, 2.0, 3.0],
            setpoint: None,
        };
        let norm = Normalization {
            fix_sign: false,
            trim_approach: false,
            ..identity_units()
        };
        assert_eq!(normalize(trace.clone(), &norm), trace);
    }
}
