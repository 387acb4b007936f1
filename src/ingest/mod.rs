//! Light curve ingestion
//!
//! Turns a target locator (a file on disk) into a validated
//! [`PhotometrySeries`]. Readers drop NaN flux rows and enforce the series
//! invariants; every failure is reported as an [`IngestionError`] variant so
//! the batch can skip that target and continue.

pub mod delimited;
pub mod json;
#[cfg(feature = "fits")]
pub mod fits;

use crate::detection_core::{PhotometrySeries, SeriesError, TargetId};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where one target's light curve lives
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetLocator(PathBuf);

impl TargetLocator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for TargetLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[derive(Debug)]
pub enum IngestionError {
    Unreadable { path: PathBuf, source: std::io::Error },
    UnsupportedFormat { path: PathBuf, extension: Option<String> },
    MissingField { path: PathBuf, field: String },
    Malformed { path: PathBuf, line: Option<usize>, reason: String },
    Empty { path: PathBuf },
    InvalidSeries { path: PathBuf, source: SeriesError },
}

impl IngestionError {
    pub fn path(&self) -> &Path {
        match self {
            IngestionError::Unreadable { path, .. }
            | IngestionError::UnsupportedFormat { path, .. }
            | IngestionError::MissingField { path, .. }
            | IngestionError::Malformed { path, .. }
            | IngestionError::Empty { path }
            | IngestionError::InvalidSeries { path, .. } => path,
        }
    }

    /// Short machine-friendly label for logs and summaries
    pub fn kind(&self) -> &'static str {
        match self {
            IngestionError::Unreadable { .. } => "unreadable",
            IngestionError::UnsupportedFormat { .. } => "unsupported_format",
            IngestionError::MissingField { .. } => "missing_field",
            IngestionError::Malformed { .. } => "malformed",
            IngestionError::Empty { .. } => "empty",
            IngestionError::InvalidSeries { .. } => "invalid_series",
        }
    }
}

impl fmt::Display for IngestionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestionError::Unreadable { path, source } => {
                write!(f, "Cannot read {}: {}", path.display(), source)
            }
            IngestionError::UnsupportedFormat { path, extension } => write!(
                f,
                "Unsupported light curve format for {} (extension: {})",
                path.display(),
                extension.as_deref().unwrap_or("none")
            ),
            IngestionError::MissingField { path, field } => {
                write!(f, "Missing field '{}' in {}", field, path.display())
            }
            IngestionError::Malformed { path, line: Some(line), reason } => {
                write!(f, "Malformed {} at line {}: {}", path.display(), line, reason)
            }
            IngestionError::Malformed { path, line: None, reason } => {
                write!(f, "Malformed {}: {}", path.display(), reason)
            }
            IngestionError::Empty { path } => {
                write!(f, "No usable samples in {}", path.display())
            }
            IngestionError::InvalidSeries { path, source } => {
                write!(f, "Invalid series in {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for IngestionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IngestionError::Unreadable { source, .. } => Some(source),
            IngestionError::InvalidSeries { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Source of light curves for a batch
///
/// Implementations never retry; a failure is final for that locator.
pub trait SeriesSource: Send + Sync {
    fn load(&self, locator: &TargetLocator) -> Result<(TargetId, PhotometrySeries), IngestionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesFormat {
    Delimited,
    Json,
    Fits,
}

impl SeriesFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "tsv" | "txt" | "dat" | "tbl" => Some(SeriesFormat::Delimited),
            "json" => Some(SeriesFormat::Json),
            "fits" | "fit" => Some(SeriesFormat::Fits),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesFormat::Delimited => "delimited",
            SeriesFormat::Json => "json",
            SeriesFormat::Fits => "fits",
        }
    }
}

/// Reads light curves from files, choosing the reader by file extension
#[derive(Debug, Clone, Default)]
pub struct FileSeriesSource;

impl FileSeriesSource {
    pub fn new() -> Self {
        Self
    }
}

impl SeriesSource for FileSeriesSource {
    fn load(&self, locator: &TargetLocator) -> Result<(TargetId, PhotometrySeries), IngestionError> {
        let path = locator.path();
        let format = SeriesFormat::from_path(path).ok_or_else(|| IngestionError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: extension_of(path),
        })?;

        log::debug!("📖 Reading {} ({})", path.display(), format.as_str());

        let series = match format {
            SeriesFormat::Delimited => delimited::read_delimited(path)?,
            SeriesFormat::Json => json::read_json(path)?,
            #[cfg(feature = "fits")]
            SeriesFormat::Fits => fits::read_fits(path)?,
            #[cfg(not(feature = "fits"))]
            SeriesFormat::Fits => {
                return Err(IngestionError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    extension: extension_of(path),
                })
            }
        };

        Ok((series.target_id().clone(), series))
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(|e| e.to_string())
}

/// Target id from a file stem, e.g. `205919993.csv` -> `Catalog(205919993)`
pub(crate) fn target_id_from_path(path: &Path) -> TargetId {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(TargetId::parse)
        .unwrap_or_else(|| TargetId::Name(path.display().to_string()))
}

/// Build a series, mapping invariant violations to [`IngestionError`]
pub(crate) fn finish_series(
    path: &Path,
    target_id: TargetId,
    time: Vec<f64>,
    flux: Vec<f64>,
    flux_err: Option<Vec<f64>>,
) -> Result<PhotometrySeries, IngestionError> {
    if time.is_empty() {
        return Err(IngestionError::Empty {
            path: path.to_path_buf(),
        });
    }
    PhotometrySeries::from_columns(target_id, time, flux, flux_err).map_err(|source| {
        IngestionError::InvalidSeries {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Locators for a batch: the file itself, or the supported files of a directory in name order
///
/// Directories are not searched recursively. Failing to read `input` is fatal
/// for the batch and is returned as an I/O error.
pub fn discover_targets(input: &Path) -> std::io::Result<Vec<TargetLocator>> {
    let metadata = std::fs::metadata(input)?;
    if metadata.is_file() {
        return Ok(vec![TargetLocator::new(input)]);
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(input)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && SeriesFormat::from_path(path).is_some())
        .collect();
    paths.sort();

    log::info!("📂 Found {} light curve(s) in {}", paths.len(), input.display());
    Ok(paths.into_iter().map(TargetLocator::new).collect())
}
