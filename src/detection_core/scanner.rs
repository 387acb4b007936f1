//! Sliding-window scan of one light curve
//!
//! Each window position is evaluated independently (local baseline, then run
//! classification). Overlapping windows re-detect the same physical dip, so
//! reported dips pass a time-separation gate: a detection is kept only if its
//! egress lies more than `min_dur * cadence` after the previously kept one.
//! Two real dips closer than that collapse into one candidate.

use super::candidate::{CandidateTable, DipCandidate};
use super::classifier::{DipClassifier, DipResult, WindowView};
use super::params::{ConfigurationError, ScanParameters};
use super::series::PhotometrySeries;
use super::stats::{estimate_local_stats, EstimatorError};
use rayon::prelude::*;

pub struct WindowScanner {
    params: ScanParameters,
    classifier: DipClassifier,
}

impl WindowScanner {
    /// Validate `params` once; the scanner is then reusable for any number of series
    pub fn new(params: ScanParameters) -> Result<Self, ConfigurationError> {
        let classifier = DipClassifier::from_params(&params)?;
        Ok(Self { params, classifier })
    }

    pub fn params(&self) -> &ScanParameters {
        &self.params
    }

    /// Window start indices `0, step, 2*step, ..` up to and including `len - win_size`
    fn window_starts(&self, len: usize) -> Vec<usize> {
        if len < self.params.win_size {
            return Vec::new();
        }
        (0..=len - self.params.win_size)
            .step_by(self.params.step_size)
            .collect()
    }

    fn evaluate(&self, series: &PhotometrySeries, start: usize) -> Option<DipResult> {
        let stats = match estimate_local_stats(
            series,
            start,
            self.params.win_size,
            self.params.neighbor_count,
        ) {
            Ok(stats) => stats,
            Err(EstimatorError::InsufficientData { window_start }) => {
                log::trace!(
                    "Skipping window at {} for {}: empty neighbourhood",
                    window_start,
                    series.target_id()
                );
                return None;
            }
            Err(e) => {
                log::debug!("Skipping window for {}: {}", series.target_id(), e);
                return None;
            }
        };

        let window = WindowView::of(series, start, self.params.win_size);
        self.classifier.classify(&window, &stats)
    }

    /// Scan window positions in order
    pub fn scan(&self, series: &PhotometrySeries) -> CandidateTable {
        let detections = self
            .window_starts(series.len())
            .into_iter()
            .filter_map(|start| self.evaluate(series, start));
        self.deduplicate(series, detections)
    }

    /// Evaluate window positions on the rayon pool, then gate them in time order
    ///
    /// Produces exactly the same table as [`WindowScanner::scan`].
    pub fn scan_parallel(&self, series: &PhotometrySeries) -> CandidateTable {
        let detections: Vec<Option<DipResult>> = self
            .window_starts(series.len())
            .par_iter()
            .map(|&start| self.evaluate(series, start))
            .collect();
        self.deduplicate(series, detections.into_iter().flatten())
    }

    fn deduplicate(
        &self,
        series: &PhotometrySeries,
        detections: impl Iterator<Item = DipResult>,
    ) -> CandidateTable {
        let min_separation = self.params.min_dur as f64 * series.cadence();
        let mut previous_egress: Option<f64> = None;
        let mut table = CandidateTable::new();

        for dip in detections {
            let is_new = previous_egress.map_or(true, |prev| dip.egress_time - prev > min_separation);
            if !is_new {
                continue;
            }

            log::debug!(
                "🎯 Dip in {}: egress={:.5} min_rel_flux={:.5}",
                series.target_id(),
                dip.egress_time,
                dip.min_relative_flux
            );
            previous_egress = Some(dip.egress_time);
            table.push(DipCandidate {
                target_id: series.target_id().clone(),
                egress_time: dip.egress_time,
                min_relative_flux: dip.min_relative_flux,
            });
        }

        table
    }
}

/// One-shot scan with explicit parameters
pub fn scan(
    series: &PhotometrySeries,
    win_size: usize,
    step_size: usize,
    neighbor_count: usize,
    min_dur: usize,
    max_dur: usize,
    detection_thresh: f64,
) -> Result<CandidateTable, ConfigurationError> {
    let scanner = WindowScanner::new(ScanParameters {
        win_size,
        step_size,
        neighbor_count,
        min_dur,
        max_dur,
        detection_thresh,
    })?;
    Ok(scanner.scan(series))
}
