//! Robust local baseline around a scan window
//!
//! The baseline is built from the windows on either side of the window under
//! test, never from the window itself, so a dip cannot drag down the threshold
//! it is tested against.

use super::series::PhotometrySeries;

/// Median and median absolute deviation of a window's neighbourhood
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalStats {
    pub median: f64,
    pub scatter: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EstimatorError {
    /// No samples outside the window fell inside the neighbourhood bounds
    InsufficientData { window_start: usize },
    WindowOutOfRange { window_start: usize, win_size: usize, len: usize },
}

impl std::fmt::Display for EstimatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimatorError::InsufficientData { window_start } => write!(
                f,
                "Empty neighbourhood for window starting at sample {}",
                window_start
            ),
            EstimatorError::WindowOutOfRange { window_start, win_size, len } => write!(
                f,
                "Window [{}, {}) exceeds series of {} samples",
                window_start,
                window_start.saturating_add(*win_size),
                len
            ),
        }
    }
}

impl std::error::Error for EstimatorError {}

/// Median of a slice; the mean of the two central values for even lengths
///
/// Callers guarantee finite input. Returns `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut buf = values.to_vec();
    Some(median_in_place(&mut buf))
}

/// Median absolute deviation around `center`
pub fn median_absolute_deviation(values: &[f64], center: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    Some(median_in_place(&mut deviations))
}

fn median_in_place(buf: &mut [f64]) -> f64 {
    let n = buf.len();
    let mid = n / 2;
    let (lower, upper_mid, _) = buf.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    let upper_mid = *upper_mid;
    if n % 2 == 1 {
        upper_mid
    } else {
        let lower_mid = lower
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        (lower_mid + upper_mid) * 0.5
    }
}

/// Neighbourhood index ranges `[i_min, window_start)` and `[window_start + win_size, i_max)`
///
/// Near either series edge (less than one window of room on that side) the
/// neighbour count is doubled so the open side makes up for the missing one.
/// Extents saturate, so any neighbour count clamps to the series.
pub fn neighborhood_bounds(
    len: usize,
    window_start: usize,
    win_size: usize,
    neighbor_count: usize,
) -> ((usize, usize), (usize, usize)) {
    let window_end = window_start.saturating_add(win_size);
    let room_left = window_start;
    let room_right = len.saturating_sub(window_end);

    let neighbors = if room_left < win_size || room_right < win_size {
        neighbor_count.saturating_mul(2)
    } else {
        neighbor_count
    };

    let i_min = window_start.saturating_sub(neighbors.saturating_mul(win_size));
    let reach = neighbors.saturating_add(1).saturating_mul(win_size);
    let i_max = len.min(window_start.saturating_add(reach));

    ((i_min, window_start), (window_end.min(i_max), i_max))
}

/// Local median and MAD around the window `[window_start, window_start + win_size)`
pub fn estimate_local_stats(
    series: &PhotometrySeries,
    window_start: usize,
    win_size: usize,
    neighbor_count: usize,
) -> Result<LocalStats, EstimatorError> {
    let len = series.len();
    if window_start.checked_add(win_size).map_or(true, |end| end > len) {
        return Err(EstimatorError::WindowOutOfRange {
            window_start,
            win_size,
            len,
        });
    }

    let ((left_lo, left_hi), (right_lo, right_hi)) =
        neighborhood_bounds(len, window_start, win_size, neighbor_count);

    let flux = series.fluxes();
    let mut neighborhood = Vec::with_capacity((left_hi - left_lo) + (right_hi - right_lo));
    neighborhood.extend_from_slice(&flux[left_lo..left_hi]);
    neighborhood.extend_from_slice(&flux[right_lo..right_hi]);

    if neighborhood.is_empty() {
        return Err(EstimatorError::InsufficientData { window_start });
    }

    let median = median_in_place(&mut neighborhood);
    let scatter = median_absolute_deviation(&neighborhood, median)
        .ok_or(EstimatorError::InsufficientData { window_start })?;

    Ok(LocalStats { median, scatter })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection_core::series::TargetId;

    fn series_from(flux: Vec<f64>) -> PhotometrySeries {
        let time = (0..flux.len()).map(|i| i as f64).collect();
        PhotometrySeries::from_columns(TargetId::Catalog(1), time, flux, None).unwrap()
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_mad() {
        // |x - 2| = [1, 0, 1, 2, 7] -> median 1
        let values = [1.0, 2.0, 3.0, 4.0, 9.0];
        assert_eq!(median_absolute_deviation(&values, 2.0), Some(1.0));
        assert_eq!(median_absolute_deviation(&[], 0.0), None);
    }

    #[test]
    fn test_local_median_example() {
        let series = series_from(vec![
            1.00, 1.01, 0.99, 0.80, 0.75, 0.95, 0.99, 0.99, 1.00, 0.80, 1.01,
        ]);
        // Only 3 samples right of the window: neighbor count doubles to 2 -> [0, 4) and [8, 11)
        let stats = estimate_local_stats(&series, 4, 4, 1).unwrap();
        assert!((stats.median - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bounds_interior() {
        // Plenty of room on both sides: no doubling
        let ((l0, l1), (r0, r1)) = neighborhood_bounds(100, 40, 10, 2);
        assert_eq!((l0, l1), (20, 40));
        assert_eq!((r0, r1), (50, 70));
    }

    #[test]
    fn test_bounds_double_at_edges() {
        let ((l0, l1), (r0, r1)) = neighborhood_bounds(100, 5, 10, 2);
        assert_eq!((l0, l1), (0, 5));
        assert_eq!((r0, r1), (15, 55));

        let ((l0, l1), (r0, r1)) = neighborhood_bounds(100, 85, 10, 2);
        assert_eq!((l0, l1), (45, 85));
        assert_eq!((r0, r1), (95, 100));
    }

    #[test]
    fn test_bounds_clamp_for_huge_neighbor_count() {
        let huge = usize::MAX / 8;
        assert_eq!(neighborhood_bounds(100, 40, 10, huge), ((0, 40), (50, 100)));
        assert_eq!(neighborhood_bounds(100, 0, 10, usize::MAX), ((0, 0), (10, 100)));

        let stats = estimate_local_stats(&series_from(vec![1.5; 100]), 40, 10, huge).unwrap();
        assert_eq!(stats.median, 1.5);
    }

    #[test]
    fn test_window_excluded() {
        let mut flux: Vec<f64> = (0..60).map(|i| 1.0 + (i % 7) as f64 * 0.01).collect();
        let base = estimate_local_stats(&series_from(flux.clone()), 25, 10, 2).unwrap();
        for f in flux.iter_mut().skip(25).take(10) {
            *f = 0.1;
        }
        let dipped = estimate_local_stats(&series_from(flux), 25, 10, 2).unwrap();
        assert_eq!(base, dipped);
    }

    #[test]
    fn test_insufficient_data() {
        let series = series_from(vec![1.0; 10]);
        assert_eq!(
            estimate_local_stats(&series, 0, 10, 2),
            Err(EstimatorError::InsufficientData { window_start: 0 })
        );
    }

    #[test]
    fn test_window_out_of_range() {
        let series = series_from(vec![1.0; 10]);
        assert!(matches!(
            estimate_local_stats(&series, 5, 10, 2),
            Err(EstimatorError::WindowOutOfRange { .. })
        ));
    }

    #[test]
    fn test_zero_scatter_on_flat_series() {
        let series = series_from(vec![2.5; 50]);
        let stats = estimate_local_stats(&series, 20, 10, 1).unwrap();
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.scatter, 0.0);
    }
}
