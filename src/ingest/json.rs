//! JSON light curves: `{"target_id": .., "time": [..], "flux": [..], "flux_err": [..]}`

use super::{finish_series, target_id_from_path, IngestionError};
use crate::detection_core::{PhotometrySeries, SeriesError, TargetId};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RawSeries {
    #[serde(default)]
    target_id: Option<TargetId>,
    #[serde(default)]
    time: Option<Vec<Option<f64>>>,
    #[serde(default)]
    flux: Option<Vec<Option<f64>>>,
    #[serde(default)]
    flux_err: Option<Vec<Option<f64>>>,
}

pub fn read_json(path: &Path) -> Result<PhotometrySeries, IngestionError> {
    let content = std::fs::read_to_string(path).map_err(|source| IngestionError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_json(path, &content)
}

pub fn parse_json(path: &Path, content: &str) -> Result<PhotometrySeries, IngestionError> {
    let raw: RawSeries = serde_json::from_str(content).map_err(|e| IngestionError::Malformed {
        path: path.to_path_buf(),
        line: Some(e.line()),
        reason: e.to_string(),
    })?;

    let missing = |field: &str| IngestionError::MissingField {
        path: path.to_path_buf(),
        field: field.to_string(),
    };
    let raw_time = raw.time.ok_or_else(|| missing("time"))?;
    let raw_flux = raw.flux.ok_or_else(|| missing("flux"))?;

    let err_len = raw.flux_err.as_ref().map(|e| e.len());
    if raw_time.len() != raw_flux.len() || err_len.map_or(false, |n| n != raw_time.len()) {
        return Err(IngestionError::InvalidSeries {
            path: path.to_path_buf(),
            source: SeriesError::LengthMismatch {
                time: raw_time.len(),
                flux: raw_flux.len(),
                flux_err: err_len,
            },
        });
    }

    let mut time = Vec::with_capacity(raw_time.len());
    let mut flux = Vec::with_capacity(raw_flux.len());
    let mut flux_err = Vec::with_capacity(raw_time.len());
    for (i, (t, f)) in raw_time.into_iter().zip(raw_flux).enumerate() {
        match (t, f) {
            (Some(t), Some(f)) if t.is_finite() && f.is_finite() => {
                time.push(t);
                flux.push(f);
                flux_err.push(raw.flux_err.as_ref().and_then(|e| e[i]));
            }
            _ => {}
        }
    }

    let target_id = raw.target_id.unwrap_or_else(|| target_id_from_path(path));
    let flux_err = flux_err.into_iter().collect::<Option<Vec<f64>>>();
    finish_series(path, target_id, time, flux, flux_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<PhotometrySeries, IngestionError> {
        parse_json(Path::new("lc/fallback.json"), content)
    }

    #[test]
    fn test_nulls_dropped() {
        let series = parse(
            r#"{"target_id": 211089792, "time": [1.0, 2.0, 3.0, 4.0], "flux": [1.0, null, 0.97, 1.01]}"#,
        )
        .unwrap();
        assert_eq!(series.target_id(), &TargetId::Catalog(211089792));
        assert_eq!(series.times(), &[1.0, 3.0, 4.0]);
        assert!(series.flux_errors().is_none());
    }

    #[test]
    fn test_flux_err_kept_when_complete() {
        let series = parse(
            r#"{"target_id": "KOI-7.01", "time": [1, 2], "flux": [1, 1], "flux_err": [0.1, 0.2]}"#,
        )
        .unwrap();
        assert_eq!(series.target_id(), &TargetId::Name("KOI-7.01".into()));
        assert_eq!(series.flux_errors(), Some(&[0.1, 0.2][..]));
    }

    #[test]
    fn test_missing_target_id_uses_stem() {
        let series = parse(r#"{"time": [1], "flux": [1]}"#).unwrap();
        assert_eq!(series.target_id(), &TargetId::Name("fallback".into()));
    }

    #[test]
    fn test_missing_flux() {
        let err = parse(r#"{"time": [1, 2]}"#).unwrap_err();
        assert!(matches!(err, IngestionError::MissingField { ref field, .. } if field == "flux"));
    }

    #[test]
    fn test_length_mismatch() {
        let err = parse(r#"{"time": [1, 2], "flux": [1]}"#).unwrap_err();
        assert_eq!(err.kind(), "invalid_series");
    }

    #[test]
    fn test_syntax_error_is_malformed() {
        let err = parse("{\"time\": [1, 2],\n \"flux\": [1, }").unwrap_err();
        assert!(matches!(err, IngestionError::Malformed { line: Some(2), .. }));
    }

    #[test]
    fn test_all_null_is_empty() {
        let err = parse(r#"{"time": [1, 2], "flux": [null, null]}"#).unwrap_err();
        assert_eq!(err.kind(), "empty");
    }
}
