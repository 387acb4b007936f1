//! Photometric time series for a single target

use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog identifier of an observed target (EPIC/KIC/TIC number or a free-form name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetId {
    Catalog(i64),
    Name(String),
}

impl TargetId {
    /// Numeric text becomes a catalog id, anything else is kept as a name
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(id) => TargetId::Catalog(id),
            Err(_) => TargetId::Name(trimmed.to_string()),
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetId::Catalog(id) => write!(f, "{}", id),
            TargetId::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<i64> for TargetId {
    fn from(id: i64) -> Self {
        TargetId::Catalog(id)
    }
}

impl From<&str> for TargetId {
    fn from(raw: &str) -> Self {
        TargetId::parse(raw)
    }
}

/// One photometric measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub flux: f64,
    pub flux_err: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesError {
    LengthMismatch { time: usize, flux: usize, flux_err: Option<usize> },
    NonFiniteFlux { index: usize },
    NonFiniteTime { index: usize },
    NonMonotonicTime { index: usize },
}

impl fmt::Display for SeriesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesError::LengthMismatch { time, flux, flux_err } => match flux_err {
                Some(err) => write!(
                    f,
                    "Column length mismatch: time={}, flux={}, flux_err={}",
                    time, flux, err
                ),
                None => write!(f, "Column length mismatch: time={}, flux={}", time, flux),
            },
            SeriesError::NonFiniteFlux { index } => {
                write!(f, "Non-finite flux at sample {}", index)
            }
            SeriesError::NonFiniteTime { index } => {
                write!(f, "Non-finite time at sample {}", index)
            }
            SeriesError::NonMonotonicTime { index } => {
                write!(f, "Time not strictly increasing at sample {}", index)
            }
        }
    }
}

impl std::error::Error for SeriesError {}

/// Time-ordered light curve of one target
///
/// Columns are stored separately so scan windows are plain borrowed slices.
/// Construction guarantees finite flux and strictly increasing time.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotometrySeries {
    target_id: TargetId,
    time: Vec<f64>,
    flux: Vec<f64>,
    flux_err: Option<Vec<f64>>,
}

impl PhotometrySeries {
    pub fn from_columns(
        target_id: TargetId,
        time: Vec<f64>,
        flux: Vec<f64>,
        flux_err: Option<Vec<f64>>,
    ) -> Result<Self, SeriesError> {
        let err_len = flux_err.as_ref().map(|e| e.len());
        if time.len() != flux.len() || err_len.map_or(false, |n| n != time.len()) {
            return Err(SeriesError::LengthMismatch {
                time: time.len(),
                flux: flux.len(),
                flux_err: err_len,
            });
        }

        if let Some(index) = flux.iter().position(|f| !f.is_finite()) {
            return Err(SeriesError::NonFiniteFlux { index });
        }
        if let Some(index) = time.iter().position(|t| !t.is_finite()) {
            return Err(SeriesError::NonFiniteTime { index });
        }
        if let Some(pos) = time.windows(2).position(|pair| pair[1] <= pair[0]) {
            return Err(SeriesError::NonMonotonicTime { index: pos + 1 });
        }

        Ok(Self {
            target_id,
            time,
            flux,
            flux_err,
        })
    }

    /// Build a series from samples; a flux error column is kept only if every sample has one
    pub fn from_samples(target_id: TargetId, samples: &[Sample]) -> Result<Self, SeriesError> {
        let time = samples.iter().map(|s| s.time).collect();
        let flux = samples.iter().map(|s| s.flux).collect();
        let flux_err = samples.iter().map(|s| s.flux_err).collect::<Option<Vec<f64>>>();
        Self::from_columns(target_id, time, flux, flux_err)
    }

    pub fn target_id(&self) -> &TargetId {
        &self.target_id
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.time
    }

    pub fn fluxes(&self) -> &[f64] {
        &self.flux
    }

    pub fn flux_errors(&self) -> Option<&[f64]> {
        self.flux_err.as_deref()
    }

    pub fn sample(&self, index: usize) -> Option<Sample> {
        let time = *self.time.get(index)?;
        let flux = self.flux[index];
        let flux_err = self.flux_err.as_ref().map(|e| e[index]);
        Some(Sample { time, flux, flux_err })
    }

    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        (0..self.len()).filter_map(move |i| self.sample(i))
    }

    /// Mean sample spacing, `(last - first) / n`; zero for fewer than two samples
    pub fn cadence(&self) -> f64 {
        match (self.time.first(), self.time.last()) {
            (Some(first), Some(last)) if self.time.len() > 1 => {
                (last - first) / self.time.len() as f64
            }
            _ => 0.0,
        }
    }
}
