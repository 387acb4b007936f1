//! Kepler/K2/TESS FITS light curves (feature `fits`)
//!
//! Reads `TIME`, `PDCSAP_FLUX` and, when present, `PDCSAP_FLUX_ERR` from the
//! first extension. The target id comes from `KEPLERID` or `TICID` in the
//! primary header, else the file stem.

use super::{finish_series, target_id_from_path, IngestionError};
use crate::detection_core::{PhotometrySeries, TargetId};
use fitsio::FitsFile;
use std::path::Path;

const ID_KEYS: &[&str] = &["KEPLERID", "TICID"];

fn fits_error(path: &Path, e: fitsio::errors::Error) -> IngestionError {
    IngestionError::Malformed {
        path: path.to_path_buf(),
        line: None,
        reason: e.to_string(),
    }
}

pub fn read_fits(path: &Path) -> Result<PhotometrySeries, IngestionError> {
    if !path.is_file() {
        return Err(IngestionError::Unreadable {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such FITS file"),
        });
    }
    let mut fptr = FitsFile::open(path).map_err(|e| fits_error(path, e))?;

    let primary = fptr.primary_hdu().map_err(|e| fits_error(path, e))?;
    let target_id = ID_KEYS
        .iter()
        .find_map(|key| primary.read_key::<i64>(&mut fptr, key).ok())
        .map(TargetId::Catalog)
        .unwrap_or_else(|| target_id_from_path(path));

    let hdu = fptr.hdu(1).map_err(|e| fits_error(path, e))?;
    let raw_time: Vec<f64> = hdu.read_col(&mut fptr, "TIME").map_err(|_| IngestionError::MissingField {
        path: path.to_path_buf(),
        field: "TIME".to_string(),
    })?;
    let raw_flux: Vec<f64> = hdu
        .read_col(&mut fptr, "PDCSAP_FLUX")
        .map_err(|_| IngestionError::MissingField {
            path: path.to_path_buf(),
            field: "PDCSAP_FLUX".to_string(),
        })?;
    let raw_err: Option<Vec<f64>> = hdu.read_col(&mut fptr, "PDCSAP_FLUX_ERR").ok();

    let keep: Vec<usize> = (0..raw_time.len().min(raw_flux.len()))
        .filter(|&i| raw_time[i].is_finite() && raw_flux[i].is_finite())
        .collect();
    log::debug!(
        "Kept {}/{} FITS rows from {}",
        keep.len(),
        raw_time.len(),
        path.display()
    );

    let time = keep.iter().map(|&i| raw_time[i]).collect();
    let flux = keep.iter().map(|&i| raw_flux[i]).collect();
    let flux_err = raw_err.and_then(|errs| {
        keep.iter()
            .map(|&i| errs.get(i).copied().filter(|e| e.is_finite()))
            .collect::<Option<Vec<f64>>>()
    });

    finish_series(path, target_id, time, flux, flux_err)
}
