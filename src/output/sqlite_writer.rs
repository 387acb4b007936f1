//! SQLite candidate store
//!
//! Each `write_table` call records one row in `scan_runs` (the parameter set)
//! and its candidates in `dip_candidates`, all inside one transaction.

use super::writer_backend::{CandidateWriterBackend, WriteMode, WriterError};
use crate::detection_core::{CandidateTable, ScanParameters};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS scan_runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at TEXT NOT NULL,
        win_size INTEGER NOT NULL,
        step_size INTEGER NOT NULL,
        neighbor_count INTEGER NOT NULL,
        min_dur INTEGER NOT NULL,
        max_dur INTEGER NOT NULL,
        detection_thresh REAL NOT NULL
    );
    CREATE TABLE IF NOT EXISTS dip_candidates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        run_id INTEGER NOT NULL REFERENCES scan_runs(id),
        target_id TEXT NOT NULL,
        egress_time REAL NOT NULL,
        min_relative_flux REAL NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_candidates_target ON dip_candidates(target_id, egress_time);
";

pub struct SqliteCandidateWriter {
    conn: Connection,
    mode: WriteMode,
}

impl SqliteCandidateWriter {
    pub fn new(db_path: impl AsRef<Path>, mode: WriteMode) -> Result<Self, WriterError> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                WriterError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to create database directory {}: {}", parent.display(), e),
                ))
            })?;
        }

        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(SCHEMA)?;

        log::info!("✅ SQLite candidate store initialized: {} ({})", db_path.display(), mode.as_str());
        Ok(Self { conn, mode })
    }
}

#[async_trait]
impl CandidateWriterBackend for SqliteCandidateWriter {
    async fn write_table(
        &mut self,
        table: &CandidateTable,
        scan_params: &ScanParameters,
    ) -> Result<(), WriterError> {
        let tx = self.conn.transaction()?;

        if self.mode == WriteMode::Overwrite {
            tx.execute("DELETE FROM dip_candidates", [])?;
            tx.execute("DELETE FROM scan_runs", [])?;
        }

        tx.execute(
            "INSERT INTO scan_runs
             (created_at, win_size, step_size, neighbor_count, min_dur, max_dur, detection_thresh)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                chrono::Utc::now().to_rfc3339(),
                scan_params.win_size as i64,
                scan_params.step_size as i64,
                scan_params.neighbor_count as i64,
                scan_params.min_dur as i64,
                scan_params.max_dur as i64,
                scan_params.detection_thresh,
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO dip_candidates (run_id, target_id, egress_time, min_relative_flux)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for row in table {
                stmt.execute(params![
                    run_id,
                    row.target_id.to_string(),
                    row.egress_time,
                    row.min_relative_flux,
                ])?;
            }
        }

        tx.commit()?;
        log::debug!("✅ Stored {} candidate(s) as scan run {}", table.len(), run_id);
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}
