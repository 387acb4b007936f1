//! CSV candidate artifact (`dips.log`)
//!
//! ```text
//! # lcps dip candidates
//! # generated_at: 2026-10-16T08:00:00+00:00
//! # win_size: 10
//! # ...
//! target_id,egress_time,min_relative_flux
//! 205919993,2144.5021,0.9871
//! "KOI 7, b",2144.6100,0.9902
//! ```
//!
//! Ids containing a comma, a double quote or a line break (or starting with
//! `#`) are written as RFC 4180 quoted fields.

use super::writer_backend::{CandidateWriterBackend, WriteMode, WriterError};
use crate::detection_core::{CandidateTable, DipCandidate, ScanParameters, TargetId};
use async_trait::async_trait;
use std::borrow::Cow;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const TITLE_LINE: &str = "# lcps dip candidates";
pub const COLUMNS_LINE: &str = "target_id,egress_time,min_relative_flux";

pub struct CsvCandidateWriter {
    path: PathBuf,
    mode: WriteMode,
}

impl CsvCandidateWriter {
    pub fn new(path: impl Into<PathBuf>, mode: WriteMode) -> Self {
        let path = path.into();
        log::info!("📝 Writing dip candidates to: {} ({})", path.display(), mode.as_str());
        Self { path, mode }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_full(&self, table: &CandidateTable, params: &ScanParameters) -> Result<(), WriterError> {
        ensure_parent(&self.path)?;
        let file = std::fs::File::create(&self.path)?;
        let mut out = BufWriter::new(file);
        write_header(&mut out, params)?;
        write_rows(&mut out, table)?;
        out.flush()?;
        Ok(())
    }

    fn append_rows(&self, table: &CandidateTable, params: &ScanParameters) -> Result<(), WriterError> {
        let existing = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        if existing.trim().is_empty() {
            return self.write_full(table, params);
        }

        check_parameters(&existing, params)?;

        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut out = BufWriter::new(file);
        if !existing.ends_with('\n') {
            writeln!(out)?;
        }
        write_rows(&mut out, table)?;
        out.flush()?;
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

pub(crate) fn write_header(out: &mut impl Write, params: &ScanParameters) -> std::io::Result<()> {
    writeln!(out, "{}", TITLE_LINE)?;
    writeln!(out, "# generated_at: {}", chrono::Utc::now().to_rfc3339())?;
    for (name, value) in params.header_fields() {
        writeln!(out, "# {}: {}", name, value)?;
    }
    writeln!(out, "{}", COLUMNS_LINE)
}

pub(crate) fn write_rows(out: &mut impl Write, table: &CandidateTable) -> std::io::Result<()> {
    for row in table {
        let id = row.target_id.to_string();
        writeln!(out, "{},{},{}", quote_field(&id), row.egress_time, row.min_relative_flux)?;
    }
    Ok(())
}

fn quote_field(value: &str) -> Cow<'_, str> {
    if value.starts_with('#') || value.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// `# name: value` header pairs of an artifact, in file order
pub fn header_parameters(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .take_while(|line| line.starts_with('#'))
        .filter_map(|line| {
            let (name, value) = line.trim_start_matches('#').split_once(':')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn check_parameters(existing: &str, params: &ScanParameters) -> Result<(), WriterError> {
    if !existing.starts_with(TITLE_LINE) {
        return Err(WriterError::MalformedArtifact(
            "existing file is not a dip candidate artifact".to_string(),
        ));
    }
    let recorded = header_parameters(existing);
    for (name, requested) in params.header_fields() {
        let found = recorded.iter().find(|(key, _)| key == name).map(|(_, v)| v.as_str());
        match found {
            Some(value) if value == requested => {}
            Some(value) => {
                return Err(WriterError::ParameterMismatch {
                    field: name.to_string(),
                    existing: value.to_string(),
                    requested,
                })
            }
            None => {
                return Err(WriterError::MalformedArtifact(format!(
                    "header does not record {}",
                    name
                )))
            }
        }
    }
    Ok(())
}

/// Read the rows of a CSV artifact back into a table
pub fn read_candidates(path: &Path) -> Result<CandidateTable, WriterError> {
    let content = std::fs::read_to_string(path)?;
    let mut table = CandidateTable::new();
    for (line, fields) in split_records(&content)? {
        if fields.len() == 3 && fields.join(",") == COLUMNS_LINE {
            continue;
        }
        let malformed = || {
            WriterError::MalformedArtifact(format!("line {}: '{}'", line, fields.join(",")))
        };
        let (id, egress, rel) = match fields.as_slice() {
            [id, egress, rel] => (id, egress, rel),
            _ => return Err(malformed()),
        };
        table.push(DipCandidate {
            target_id: TargetId::parse(id),
            egress_time: egress.trim().parse().map_err(|_| malformed())?,
            min_relative_flux: rel.trim().parse().map_err(|_| malformed())?,
        });
    }
    Ok(table)
}

/// Data records of an artifact with their starting line, comments and blank lines skipped
///
/// A field opening with `"` runs to the matching unescaped quote; `""` inside
/// it stands for one quote character and line breaks are kept verbatim.
fn split_records(content: &str) -> Result<Vec<(usize, Vec<String>)>, WriterError> {
    let mut records = Vec::new();
    let mut chars = content.chars().peekable();
    let mut line = 1usize;

    while let Some(&first) = chars.peek() {
        if matches!(first, '#' | '\n' | '\r') {
            for c in chars.by_ref() {
                if c == '\n' {
                    break;
                }
            }
            line += 1;
            continue;
        }

        let start_line = line;
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        loop {
            match chars.next() {
                None => break,
                Some('"') if in_quotes => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                Some('"') if field.is_empty() => in_quotes = true,
                Some(c) if in_quotes => {
                    if c == '\n' {
                        line += 1;
                    }
                    field.push(c);
                }
                Some(',') => fields.push(std::mem::take(&mut field)),
                Some('\n') => {
                    line += 1;
                    break;
                }
                Some('\r') => {}
                Some(c) => field.push(c),
            }
        }
        if in_quotes {
            return Err(WriterError::MalformedArtifact(format!(
                "line {}: unterminated quoted field",
                start_line
            )));
        }
        fields.push(field);
        records.push((start_line, fields));
    }

    Ok(records)
}

#[async_trait]
impl CandidateWriterBackend for CsvCandidateWriter {
    async fn write_table(
        &mut self,
        table: &CandidateTable,
        params: &ScanParameters,
    ) -> Result<(), WriterError> {
        match self.mode {
            WriteMode::Overwrite => self.write_full(table, params)?,
            WriteMode::Append => self.append_rows(table, params)?,
        }
        log::debug!("✅ Wrote {} candidate row(s) to {}", table.len(), self.path.display());
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "CSV"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn table_of(rows: &[(i64, f64, f64)]) -> CandidateTable {
        rows.iter()
            .map(|&(id, egress_time, min_relative_flux)| DipCandidate {
                target_id: TargetId::Catalog(id),
                egress_time,
                min_relative_flux,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_overwrite_writes_header_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dips.log");
        std::fs::write(&path, "stale content\n").unwrap();

        let mut writer = CsvCandidateWriter::new(&path, WriteMode::Overwrite);
        let table = table_of(&[(205919993, 2144.5, 0.987), (205919993, 2150.25, 0.99)]);
        writer.write_table(&table, &ScanParameters::default()).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(TITLE_LINE));
        assert!(!content.contains("stale"));
        assert!(content.contains("# detection_thresh: 0.995"));
        assert!(content.contains(COLUMNS_LINE));
        assert_eq!(read_candidates(&path).unwrap(), table);
    }

    #[tokio::test]
    async fn test_header_records_every_parameter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dips.log");
        let params = ScanParameters {
            win_size: 12,
            ..Default::default()
        };
        CsvCandidateWriter::new(&path, WriteMode::Overwrite)
            .write_table(&CandidateTable::new(), &params)
            .await
            .unwrap();

        let recorded = header_parameters(&std::fs::read_to_string(&path).unwrap());
        for (name, value) in params.header_fields() {
            assert!(recorded.contains(&(name.to_string(), value)));
        }
    }

    #[tokio::test]
    async fn test_append_to_missing_file_writes_full_artifact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("dips.log");
        let table = table_of(&[(1, 10.0, 0.98)]);
        CsvCandidateWriter::new(&path, WriteMode::Append)
            .write_table(&table, &ScanParameters::default())
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(TITLE_LINE));
        assert_eq!(read_candidates(&path).unwrap(), table);
    }

    #[tokio::test]
    async fn test_append_keeps_single_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dips.log");
        let params = ScanParameters::default();

        CsvCandidateWriter::new(&path, WriteMode::Overwrite)
            .write_table(&table_of(&[(1, 10.0, 0.98)]), &params)
            .await
            .unwrap();
        CsvCandidateWriter::new(&path, WriteMode::Append)
            .write_table(&table_of(&[(2, 20.0, 0.97)]), &params)
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches(TITLE_LINE).count(), 1);
        assert_eq!(
            read_candidates(&path).unwrap(),
            table_of(&[(1, 10.0, 0.98), (2, 20.0, 0.97)])
        );
    }

    #[tokio::test]
    async fn test_append_with_different_parameters_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dips.log");
        CsvCandidateWriter::new(&path, WriteMode::Overwrite)
            .write_table(&table_of(&[(1, 10.0, 0.98)]), &ScanParameters::default())
            .await
            .unwrap();

        let other = ScanParameters {
            max_dur: 4,
            ..Default::default()
        };
        let err = CsvCandidateWriter::new(&path, WriteMode::Append)
            .write_table(&table_of(&[(2, 20.0, 0.97)]), &other)
            .await
            .unwrap_err();
        assert!(matches!(err, WriterError::ParameterMismatch { ref field, .. } if field == "max_dur"));
        assert_eq!(read_candidates(&path).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_named_ids_with_separators_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dips.log");
        let params = ScanParameters::default();
        let named = |name: &str, egress_time: f64| DipCandidate {
            target_id: TargetId::Name(name.to_string()),
            egress_time,
            min_relative_flux: 0.9,
        };
        let table: CandidateTable = vec![
            named("KOI 7, b", 1.0),
            named("HD \"189733\"", 2.0),
            named("two\nlines", 3.0),
            named("#12", 3.5),
        ]
        .into_iter()
        .collect();

        CsvCandidateWriter::new(&path, WriteMode::Overwrite)
            .write_table(&table, &params)
            .await
            .unwrap();
        CsvCandidateWriter::new(&path, WriteMode::Append)
            .write_table(&table_of(&[(5, 4.0, 0.97)]), &params)
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"KOI 7, b\",1,0.9"));
        assert!(content.contains("\"HD \"\"189733\"\"\",2,0.9"));

        let rows = read_candidates(&path).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(&rows.as_slice()[..4], table.as_slice());
        assert_eq!(rows.as_slice()[4].target_id, TargetId::Catalog(5));
    }

    #[test]
    fn test_unterminated_quote_is_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dips.log");
        std::fs::write(&path, "# lcps dip candidates\n\"KOI 7, b,1,0.9\n").unwrap();
        assert!(matches!(read_candidates(&path), Err(WriterError::MalformedArtifact(_))));
    }

    #[tokio::test]
    async fn test_append_to_foreign_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dips.log");
        std::fs::write(&path, "EPIC,t_egress,minFlux\n1,2,3\n").unwrap();

        let err = CsvCandidateWriter::new(&path, WriteMode::Append)
            .write_table(&CandidateTable::new(), &ScanParameters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WriterError::MalformedArtifact(_)));
    }
}
