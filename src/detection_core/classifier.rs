//! Run-length dip classification with configurable duration bounds

use super::params::{ConfigurationError, ScanParameters};
use super::series::PhotometrySeries;
use super::stats::LocalStats;

/// Borrowed view of one scan window plus the samples just outside it
///
/// `before` is the flux of the sample preceding the window and `after` the
/// `(time, flux)` of the sample following it; both are `None` at series edges.
#[derive(Debug, Clone, Copy)]
pub struct WindowView<'a> {
    pub times: &'a [f64],
    pub fluxes: &'a [f64],
    pub before: Option<f64>,
    pub after: Option<(f64, f64)>,
}

impl<'a> WindowView<'a> {
    /// A window with nothing known outside it
    pub fn isolated(times: &'a [f64], fluxes: &'a [f64]) -> Self {
        Self {
            times,
            fluxes,
            before: None,
            after: None,
        }
    }

    /// Window `[start, start + win_size)` of `series`; the caller keeps it in bounds
    pub fn of(series: &'a PhotometrySeries, start: usize, win_size: usize) -> Self {
        let end = start + win_size;
        let times = series.times();
        let fluxes = series.fluxes();
        Self {
            times: &times[start..end],
            fluxes: &fluxes[start..end],
            before: start.checked_sub(1).map(|i| fluxes[i]),
            after: times.get(end).map(|&t| (t, fluxes[end])),
        }
    }

    pub fn len(&self) -> usize {
        self.fluxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fluxes.is_empty()
    }
}

/// A qualifying low-flux run found inside one window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DipResult {
    /// Time of the first sample back at or above threshold
    pub egress_time: f64,
    /// Minimum flux of the run divided by the local median
    pub min_relative_flux: f64,
}

pub struct DipClassifier {
    min_dur: usize,
    max_dur: usize,
    detection_thresh: f64,
}

impl DipClassifier {
    /// Build without validation; use [`DipClassifier::from_params`] ahead of a scan
    pub fn new(min_dur: usize, max_dur: usize, detection_thresh: f64) -> Self {
        Self {
            min_dur,
            max_dur,
            detection_thresh,
        }
    }

    pub fn from_params(params: &ScanParameters) -> Result<Self, ConfigurationError> {
        params.validate()?;
        Ok(Self::new(params.min_dur, params.max_dur, params.detection_thresh))
    }

    pub fn with_defaults() -> Self {
        let params = ScanParameters::default();
        Self::new(params.min_dur, params.max_dur, params.detection_thresh)
    }

    /// Effective low-flux threshold: never above one scatter below the median
    pub fn flux_threshold(&self, stats: &LocalStats) -> f64 {
        (self.detection_thresh * stats.median).min(stats.median - stats.scatter)
    }

    fn accepts(&self, run_len: usize) -> bool {
        self.min_dur <= run_len && run_len <= self.max_dur
    }

    /// Report the first run of low samples whose length lies in `[min_dur, max_dur]`
    ///
    /// Runs are terminated by the first sample at or above threshold; a run
    /// reaching the window end is terminated by the sample after the window.
    /// A run whose extent is not fully observed (it continues before the
    /// window start or past the window end) is never reported. Non-positive
    /// baselines yield no dip since relative flux is undefined for them.
    pub fn classify(&self, window: &WindowView<'_>, stats: &LocalStats) -> Option<DipResult> {
        if !(stats.median > 0.0) {
            return None;
        }
        let thresh = self.flux_threshold(stats);

        let mut run_len = 0usize;
        let mut run_min = f64::INFINITY;
        let mut truncated = false;

        for (i, (&time, &flux)) in window.times.iter().zip(window.fluxes).enumerate() {
            if flux < thresh {
                if run_len == 0 {
                    truncated = i == 0 && window.before.map_or(false, |b| b < thresh);
                    run_min = flux;
                } else {
                    run_min = run_min.min(flux);
                }
                run_len += 1;
            } else if run_len > 0 {
                if !truncated && self.accepts(run_len) {
                    return Some(DipResult {
                        egress_time: time,
                        min_relative_flux: run_min / stats.median,
                    });
                }
                // Look for another run in the rest of the window
                run_len = 0;
            }
        }

        if run_len > 0 && !truncated && self.accepts(run_len) {
            if let Some((time, flux)) = window.after {
                if flux >= thresh {
                    return Some(DipResult {
                        egress_time: time,
                        min_relative_flux: run_min / stats.median,
                    });
                }
            }
        }

        None
    }
}

/// Stateless form of [`DipClassifier::classify`] for a window with no outside context
pub fn classify(
    times: &[f64],
    fluxes: &[f64],
    min_dur: usize,
    max_dur: usize,
    local_median: f64,
    local_scatter: f64,
    detection_thresh: f64,
) -> Option<DipResult> {
    let classifier = DipClassifier::new(min_dur, max_dur, detection_thresh);
    let stats = LocalStats {
        median: local_median,
        scatter: local_scatter,
    };
    classifier.classify(&WindowView::isolated(times, fluxes), &stats)
}
