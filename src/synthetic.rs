//! Seeded synthetic light curves for demos and tests
//!
//! Noise is Gaussian (Box-Muller over a seeded `StdRng`), so a given seed
//! always yields the same series.

use crate::detection_core::{PhotometrySeries, SeriesError, TargetId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DEFAULT_SAMPLES: usize = 1000;
pub const DEFAULT_MEAN: f64 = 1.0;
pub const DEFAULT_SCALE: f64 = 0.005;
pub const DEFAULT_SEED: u64 = 99;

/// Kepler long cadence in days
pub const DEFAULT_CADENCE: f64 = 0.02043;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSpec {
    pub target_id: TargetId,
    pub samples: usize,
    pub mean: f64,
    /// Standard deviation of the Gaussian noise; 0 gives a flat series
    pub scale: f64,
    pub cadence: f64,
    pub seed: u64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            target_id: TargetId::Name("synthetic".to_string()),
            samples: DEFAULT_SAMPLES,
            mean: DEFAULT_MEAN,
            scale: DEFAULT_SCALE,
            cadence: DEFAULT_CADENCE,
            seed: DEFAULT_SEED,
        }
    }
}

/// Box-Muller draw from N(0, 1)
fn standard_normal(rng: &mut StdRng) -> f64 {
    // gen::<f64>() is in [0, 1); shift to (0, 1] so ln() stays finite
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

pub fn gaussian_series(spec: &SyntheticSpec) -> Result<PhotometrySeries, SeriesError> {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let time = (0..spec.samples).map(|i| i as f64 * spec.cadence).collect();
    let flux = (0..spec.samples)
        .map(|_| spec.mean + spec.scale * standard_normal(&mut rng))
        .collect();
    PhotometrySeries::from_columns(spec.target_id.clone(), time, flux, None)
}

/// Noise-free series at `level` with unit time steps
pub fn flat_series(target_id: TargetId, samples: usize, level: f64) -> Result<PhotometrySeries, SeriesError> {
    let time = (0..samples).map(|i| i as f64).collect();
    PhotometrySeries::from_columns(target_id, time, vec![level; samples], None)
}

/// Copy of `series` with flux scaled by `depth` over `[start, start + len)`
///
/// `depth` is the remaining fraction of flux, e.g. 0.98 for a 2% dip. The
/// range is clipped to the series.
pub fn insert_dip(
    series: &PhotometrySeries,
    start: usize,
    len: usize,
    depth: f64,
) -> Result<PhotometrySeries, SeriesError> {
    let mut flux = series.fluxes().to_vec();
    let end = (start + len).min(flux.len());
    for f in flux.iter_mut().take(end).skip(start) {
        *f *= depth;
    }
    PhotometrySeries::from_columns(
        series.target_id().clone(),
        series.times().to_vec(),
        flux,
        series.flux_errors().map(|e| e.to_vec()),
    )
}
