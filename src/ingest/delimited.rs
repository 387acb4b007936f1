//! Delimited text light curves (CSV, whitespace or tab separated)
//!
//! Accepted layout:
//!
//! ```text
//! # target_id: 205919993        (also "# KEPLERID = ...", "# EPIC ...", "# TIC ...")
//! time,flux,flux_err            (optional header row)
//! 2144.0012,1.00032,0.00011
//! ```
//!
//! A line containing a comma is split on commas, anything else on whitespace.
//! Without a header the columns are positional: time, flux, optional error.

use super::{finish_series, target_id_from_path, IngestionError};
use crate::detection_core::{PhotometrySeries, TargetId};
use std::io::{BufWriter, Write};
use std::path::Path;

const TIME_NAMES: &[&str] = &["time", "t", "bjd", "btjd"];
const FLUX_NAMES: &[&str] = &["flux", "pdcsap_flux", "sap_flux"];
const ERR_NAMES: &[&str] = &["flux_err", "flux_error", "pdcsap_flux_err", "err"];
const ID_KEYS: &[&str] = &["target_id", "keplerid", "epic", "tic"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    time: usize,
    flux: usize,
    flux_err: Option<usize>,
}

impl Columns {
    const POSITIONAL: Columns = Columns {
        time: 0,
        flux: 1,
        flux_err: Some(2),
    };

    fn from_header(path: &Path, names: &[String]) -> Result<Self, IngestionError> {
        let find = |aliases: &[&str]| names.iter().position(|n| aliases.contains(&n.as_str()));
        let time = find(TIME_NAMES).ok_or_else(|| IngestionError::MissingField {
            path: path.to_path_buf(),
            field: "time".to_string(),
        })?;
        let flux = find(FLUX_NAMES).ok_or_else(|| IngestionError::MissingField {
            path: path.to_path_buf(),
            field: "flux".to_string(),
        })?;
        Ok(Self {
            time,
            flux,
            flux_err: find(ERR_NAMES),
        })
    }
}

pub fn read_delimited(path: &Path) -> Result<PhotometrySeries, IngestionError> {
    let content = std::fs::read_to_string(path).map_err(|source| IngestionError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_delimited(path, &content)
}

/// Parse delimited text; `path` names the source in errors and supplies the fallback id
pub fn parse_delimited(path: &Path, content: &str) -> Result<PhotometrySeries, IngestionError> {
    let mut target_id: Option<TargetId> = None;
    let mut columns: Option<Columns> = None;
    let mut time = Vec::new();
    let mut flux = Vec::new();
    let mut flux_err: Vec<Option<f64>> = Vec::new();
    let mut dropped = 0usize;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            if target_id.is_none() {
                target_id = id_from_comment(comment);
            }
            continue;
        }

        let fields = split_fields(line);

        let cols = match columns {
            Some(cols) => cols,
            None => {
                // The first data line decides between header and positional layout
                let is_header = fields.iter().any(|f| !f.is_empty() && f.parse::<f64>().is_err());
                if is_header {
                    let names: Vec<String> = fields.iter().map(|f| f.to_ascii_lowercase()).collect();
                    columns = Some(Columns::from_header(path, &names)?);
                    continue;
                }
                columns = Some(Columns::POSITIONAL);
                Columns::POSITIONAL
            }
        };

        let (t, f) = match (fields.get(cols.time), fields.get(cols.flux)) {
            (Some(t), Some(f)) => (*t, *f),
            _ => {
                return Err(IngestionError::Malformed {
                    path: path.to_path_buf(),
                    line: Some(line_no),
                    reason: format!("expected at least {} columns", cols.time.max(cols.flux) + 1),
                })
            }
        };

        let t = parse_value(path, line_no, "time", t)?;
        let f = parse_value(path, line_no, "flux", f)?;
        match (t, f) {
            (Some(t), Some(f)) if t.is_finite() && f.is_finite() => {
                let err = match cols.flux_err.and_then(|i| fields.get(i)) {
                    Some(e) => parse_value(path, line_no, "flux_err", e)?.filter(|e| e.is_finite()),
                    None => None,
                };
                time.push(t);
                flux.push(f);
                flux_err.push(err);
            }
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        log::debug!("Dropped {} NaN row(s) from {}", dropped, path.display());
    }

    let target_id = target_id.unwrap_or_else(|| target_id_from_path(path));
    let flux_err = flux_err.into_iter().collect::<Option<Vec<f64>>>();
    finish_series(path, target_id, time, flux, flux_err)
}

fn split_fields(line: &str) -> Vec<&str> {
    if line.contains(',') {
        line.split(',').map(str::trim).collect()
    } else {
        line.split_whitespace().collect()
    }
}

/// `Ok(None)` for an empty cell, which drops the row like a NaN does
fn parse_value(path: &Path, line: usize, field: &str, raw: &str) -> Result<Option<f64>, IngestionError> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| IngestionError::Malformed {
            path: path.to_path_buf(),
            line: Some(line),
            reason: format!("{} value '{}' is not a number", field, raw),
        })
}

fn id_from_comment(comment: &str) -> Option<TargetId> {
    let comment = comment.trim();
    let split_at = comment.find(|c: char| c == ':' || c == '=' || c.is_whitespace())?;
    let key = comment[..split_at].trim().to_ascii_lowercase();
    if !ID_KEYS.contains(&key.as_str()) {
        return None;
    }
    let value = comment[split_at..]
        .trim_start_matches(|c: char| c == ':' || c == '=' || c.is_whitespace())
        .trim()
        .trim_matches(|c| c == '\'' || c == '"');
    if value.is_empty() {
        None
    } else {
        Some(TargetId::parse(value))
    }
}

/// Write `series` as a commented CSV light curve that [`read_delimited`] reads back
pub fn write_delimited_series(path: &Path, series: &PhotometrySeries) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut out = BufWriter::new(file);

    writeln!(out, "# target_id: {}", series.target_id())?;
    match series.flux_errors() {
        Some(errors) => {
            writeln!(out, "time,flux,flux_err")?;
            for ((t, f), e) in series.times().iter().zip(series.fluxes()).zip(errors) {
                writeln!(out, "{},{},{}", t, f, e)?;
            }
        }
        None => {
            writeln!(out, "time,flux")?;
            for (t, f) in series.times().iter().zip(series.fluxes()) {
                writeln!(out, "{},{}", t, f)?;
            }
        }
    }

    out.flush()
}
