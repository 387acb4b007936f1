//! Unified writer interface for candidate tables
//!
//! Routes writes to the CSV, JSONL or SQLite backend based on configuration.

use super::csv_writer::CsvCandidateWriter;
use super::jsonl_writer::JsonlCandidateWriter;
use super::sqlite_writer::SqliteCandidateWriter;
use super::writer_backend::{CandidateWriterBackend, WriteMode, WriterError};
use crate::detection_core::{CandidateTable, ScanParameters};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendType {
    #[default]
    Csv,
    Jsonl,
    Sqlite,
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(BackendType::Csv),
            "jsonl" => Ok(BackendType::Jsonl),
            "sqlite" => Ok(BackendType::Sqlite),
            other => Err(format!("unknown backend '{}' (expected csv, jsonl or sqlite)", other)),
        }
    }
}

/// Unified writer that routes to one backend
pub enum CandidateWriter {
    Csv(CsvCandidateWriter),
    Jsonl(JsonlCandidateWriter),
    Sqlite(SqliteCandidateWriter),
}

impl CandidateWriter {
    /// Create a new candidate writer based on backend type
    pub fn new(backend: BackendType, path: PathBuf, mode: WriteMode) -> Result<Self, WriterError> {
        match backend {
            BackendType::Csv => Ok(CandidateWriter::Csv(CsvCandidateWriter::new(path, mode))),
            BackendType::Jsonl => Ok(CandidateWriter::Jsonl(JsonlCandidateWriter::new(path, mode))),
            BackendType::Sqlite => {
                let writer = SqliteCandidateWriter::new(path, mode)?;
                Ok(CandidateWriter::Sqlite(writer))
            }
        }
    }

    pub async fn write_table(
        &mut self,
        table: &CandidateTable,
        params: &ScanParameters,
    ) -> Result<(), WriterError> {
        match self {
            CandidateWriter::Csv(w) => w.write_table(table, params).await,
            CandidateWriter::Jsonl(w) => w.write_table(table, params).await,
            CandidateWriter::Sqlite(w) => w.write_table(table, params).await,
        }
    }

    /// Get backend type for logging
    pub fn backend_type(&self) -> &'static str {
        match self {
            CandidateWriter::Csv(w) => w.backend_type(),
            CandidateWriter::Jsonl(w) => w.backend_type(),
            CandidateWriter::Sqlite(w) => w.backend_type(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("csv".parse::<BackendType>(), Ok(BackendType::Csv));
        assert_eq!("JSONL".parse::<BackendType>(), Ok(BackendType::Jsonl));
        assert_eq!("sqlite".parse::<BackendType>(), Ok(BackendType::Sqlite));
        assert!("parquet".parse::<BackendType>().is_err());
    }

    #[tokio::test]
    async fn test_router_dispatches_to_backend() {
        let dir = tempdir().unwrap();
        for (backend, name, label) in [
            (BackendType::Csv, "dips.log", "CSV"),
            (BackendType::Jsonl, "dips.jsonl", "JSONL"),
            (BackendType::Sqlite, "dips.db", "SQLite"),
        ] {
            let path = dir.path().join(name);
            let mut writer = CandidateWriter::new(backend, path.clone(), WriteMode::Overwrite).unwrap();
            assert_eq!(writer.backend_type(), label);
            writer
                .write_table(&CandidateTable::new(), &ScanParameters::default())
                .await
                .unwrap();
            assert!(path.exists());
        }
    }
}
