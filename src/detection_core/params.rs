//! Scan parameters and their one-time validation

use serde::{Deserialize, Serialize};

pub const DEFAULT_WIN_SIZE: usize = 10;
pub const DEFAULT_STEP_SIZE: usize = 1;
pub const DEFAULT_NEIGHBOR_COUNT: usize = 2;
pub const DEFAULT_MIN_DUR: usize = 2;
pub const DEFAULT_MAX_DUR: usize = 5;
pub const DEFAULT_DETECTION_THRESH: f64 = 0.995;

/// Tuning parameters shared by every target of a batch
///
/// Durations and sizes are counted in samples, not time units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanParameters {
    /// Samples per sliding window
    pub win_size: usize,
    /// Samples the window advances per step
    pub step_size: usize,
    /// Neighbouring windows on each side used for the local baseline
    pub neighbor_count: usize,
    /// Shortest accepted dip, in samples
    pub min_dur: usize,
    /// Longest accepted dip, in samples
    pub max_dur: usize,
    /// Fraction of the local median below which a sample counts as low
    pub detection_thresh: f64,
}

impl Default for ScanParameters {
    fn default() -> Self {
        Self {
            win_size: DEFAULT_WIN_SIZE,
            step_size: DEFAULT_STEP_SIZE,
            neighbor_count: DEFAULT_NEIGHBOR_COUNT,
            min_dur: DEFAULT_MIN_DUR,
            max_dur: DEFAULT_MAX_DUR,
            detection_thresh: DEFAULT_DETECTION_THRESH,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    DurationOrder { min_dur: usize, max_dur: usize },
    WindowTooShort { win_size: usize, max_dur: usize },
    ZeroMinDuration,
    ZeroStep,
    ZeroNeighbors,
    InvalidThreshold(f64),
}

impl std::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationError::DurationOrder { min_dur, max_dur } => write!(
                f,
                "min dip duration ({}) greater than max dip duration ({})",
                min_dur, max_dur
            ),
            ConfigurationError::WindowTooShort { win_size, max_dur } => write!(
                f,
                "max dip duration ({}) must be smaller than the window size ({})",
                max_dur, win_size
            ),
            ConfigurationError::ZeroMinDuration => {
                write!(f, "min dip duration must be at least one sample")
            }
            ConfigurationError::ZeroStep => write!(f, "step size must be at least one sample"),
            ConfigurationError::ZeroNeighbors => {
                write!(f, "neighbor count must be at least one window")
            }
            ConfigurationError::InvalidThreshold(value) => write!(
                f,
                "detection threshold must be a positive finite number, got {}",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigurationError {}

impl ScanParameters {
    /// Check the parameter combination once, before any window is scanned
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.min_dur > self.max_dur {
            return Err(ConfigurationError::DurationOrder {
                min_dur: self.min_dur,
                max_dur: self.max_dur,
            });
        }
        if self.max_dur >= self.win_size {
            return Err(ConfigurationError::WindowTooShort {
                win_size: self.win_size,
                max_dur: self.max_dur,
            });
        }
        if self.min_dur == 0 {
            return Err(ConfigurationError::ZeroMinDuration);
        }
        if self.step_size == 0 {
            return Err(ConfigurationError::ZeroStep);
        }
        if self.neighbor_count == 0 {
            return Err(ConfigurationError::ZeroNeighbors);
        }
        if !self.detection_thresh.is_finite() || self.detection_thresh <= 0.0 {
            return Err(ConfigurationError::InvalidThreshold(self.detection_thresh));
        }
        Ok(())
    }

    /// Ordered `(name, value)` pairs used by every artifact header
    pub fn header_fields(&self) -> [(&'static str, String); 6] {
        [
            ("win_size", self.win_size.to_string()),
            ("step_size", self.step_size.to_string()),
            ("neighbor_count", self.neighbor_count.to_string()),
            ("min_dur", self.min_dur.to_string()),
            ("max_dur", self.max_dur.to_string()),
            ("detection_thresh", self.detection_thresh.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ScanParameters::default().validate().is_ok());
    }

    #[test]
    fn test_min_greater_than_max() {
        let params = ScanParameters {
            min_dur: 6,
            max_dur: 5,
            ..Default::default()
        };
        assert_eq!(
            params.validate(),
            Err(ConfigurationError::DurationOrder { min_dur: 6, max_dur: 5 })
        );
    }

    #[test]
    fn test_max_dur_must_fit_window() {
        let params = ScanParameters {
            win_size: 5,
            max_dur: 5,
            ..Default::default()
        };
        assert_eq!(
            params.validate(),
            Err(ConfigurationError::WindowTooShort { win_size: 5, max_dur: 5 })
        );

        let params = ScanParameters {
            win_size: 6,
            max_dur: 5,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_degenerate_values_rejected() {
        let zero_step = ScanParameters { step_size: 0, ..Default::default() };
        assert_eq!(zero_step.validate(), Err(ConfigurationError::ZeroStep));

        let zero_min = ScanParameters { min_dur: 0, ..Default::default() };
        assert_eq!(zero_min.validate(), Err(ConfigurationError::ZeroMinDuration));

        let zero_neighbors = ScanParameters { neighbor_count: 0, ..Default::default() };
        assert_eq!(zero_neighbors.validate(), Err(ConfigurationError::ZeroNeighbors));

        let nan_thresh = ScanParameters { detection_thresh: f64::NAN, ..Default::default() };
        assert!(matches!(
            nan_thresh.validate(),
            Err(ConfigurationError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_header_fields_order() {
        let names: Vec<&str> = ScanParameters::default()
            .header_fields()
            .iter()
            .map(|(name, _)| *name)
            .collect();
        assert_eq!(
            names,
            vec!["win_size", "step_size", "neighbor_count", "min_dur", "max_dur", "detection_thresh"]
        );
    }
}
