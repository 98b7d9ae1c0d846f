//! Writes a synthetic scratch test: an instrument-style CSV and a matching
//! panorama, for trying out the viewer without lab data.

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};

/// Track length in µm.
const TRACK_UM: f64 = 3000.0;
/// Sampling step in µm.
const STEP_UM: f64 = 2.0;
/// Encoder counts per µm, as logged by the instrument.
const COUNTS_PER_UM: f64 = 25.6;
/// Approach/stabilisation rows logged at position 0.
const APPROACH_ROWS: usize = 25;
/// Load ramp in mN.
const LOAD_START: f64 = 5_000.0;
const LOAD_END: f64 = 60_000.0;

/// Panorama scale (the default "olympus" preset), µm per pixel.
const UM_PER_PX: f64 = 0.44;
const ORIGIN_PX: (u32, u32) = (300, 200);
const HEIGHT_PX: u32 = 400;

/// Fracture events: (position µm, force drop mN).
const FRACTURES: [(f64, f64); 3] = [(820.0, 900.0), (1650.0, 2200.0), (2480.0, 4000.0)];

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn setpoint(um: f64) -> f64 {
    LOAD_START + (LOAD_END - LOAD_START) * (um / TRACK_UM)
}

/// Measured force: setpoint plus noise, with a dip at each fracture.
fn measured(um: f64, rng: &mut SimpleRng) -> f64 {
    let dips: f64 = FRACTURES
        .iter()
        .map(|&(mu, drop)| gaussian(um, mu, 6.0, drop))
        .sum();
    setpoint(um) - dips + rng.gauss(0.0, 120.0)
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn write_csv(path: &str, rng: &mut SimpleRng) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    writer.write_record(["x", "fIn", "fSet"])?;

    let mut rows = 0;
    for _ in 0..APPROACH_ROWS {
        let f = LOAD_START + rng.gauss(0.0, 40.0);
        writer.write_record(["0".to_string(), format!("{f:.1}"), format!("{LOAD_START:.1}")])?;
        rows += 1;
    }

    let steps = (TRACK_UM / STEP_UM) as usize;
    for i in 1..=steps {
        let um = i as f64 * STEP_UM;
        writer.write_record([
            format!("{:.1}", um * COUNTS_PER_UM),
            format!("{:.1}", measured(um, rng)),
            format!("{:.1}", setpoint(um)),
        ])?;
        rows += 1;
    }
    writer.flush().context("flushing CSV")?;
    Ok(rows)
}

fn write_panorama(path: &str, rng: &mut SimpleRng) -> Result<(u32, u32)> {
    let width = ORIGIN_PX.0 + (TRACK_UM / UM_PER_PX) as u32 + 200;
    let mut img = RgbImage::new(width, HEIGHT_PX);

    for (x, y, px) in img.enumerate_pixels_mut() {
        let um = (x as f64 - ORIGIN_PX.0 as f64) * UM_PER_PX;
        let base = 150.0 + rng.gauss(0.0, 6.0);

        // The groove widens with load and only exists along the track.
        let half_width = 6.0 + 30.0 * (um / TRACK_UM).clamp(0.0, 1.0);
        let dy = (y as f64 - ORIGIN_PX.1 as f64).abs();
        let on_track = (0.0..=TRACK_UM).contains(&um) && dy < half_width;
        let mut v = if on_track { base + 50.0 } else { base };

        // Dark chipping bands at fractures.
        for &(mu, _) in &FRACTURES {
            if on_track || dy < half_width * 1.6 {
                v -= gaussian(um, mu, 4.0, 110.0);
            }
        }

        let v = v.clamp(0.0, 255.0) as u8;
        *px = Rgb([v, v, v.saturating_add(8)]);
    }

    img.save(path).context("writing panorama")?;
    Ok((width, HEIGHT_PX))
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let csv_path = "sample_scratch.csv";
    let rows = write_csv(csv_path, &mut rng)?;
    println!("Wrote {rows} rows ({APPROACH_ROWS} approach) to {csv_path}");

    let png_path = "sample_scratch.png";
    let (w, h) = write_panorama(png_path, &mut rng)?;
    println!(
        "Wrote {w}x{h} panorama to {png_path}; origin at pixel ({}, {}), {UM_PER_PX} µm/px",
        ORIGIN_PX.0, ORIGIN_PX.1
    );
    Ok(())
}
