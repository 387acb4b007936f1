//! JSONL candidate artifact
//!
//! One `parameters` record opens every block and is followed by that block's
//! `candidate` records. Appending adds a new block, so mixed parameter sets
//! stay distinguishable.

use super::writer_backend::{CandidateWriterBackend, WriteMode, WriterError};
use crate::detection_core::{CandidateTable, ScanParameters, TargetId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum JsonlRecord {
    Parameters {
        generated_at: String,
        #[serde(flatten)]
        params: ScanParameters,
    },
    Candidate {
        target_id: TargetId,
        egress_time: f64,
        min_relative_flux: f64,
    },
}

pub struct JsonlCandidateWriter {
    path: PathBuf,
    mode: WriteMode,
}

impl JsonlCandidateWriter {
    pub fn new(path: impl Into<PathBuf>, mode: WriteMode) -> Self {
        let path = path.into();
        log::info!("📝 Writing dip candidates to: {} ({})", path.display(), mode.as_str());
        Self { path, mode }
    }

    fn open(&self) -> std::io::Result<std::fs::File> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        match self.mode {
            WriteMode::Overwrite => std::fs::File::create(&self.path),
            WriteMode::Append => OpenOptions::new().create(true).append(true).open(&self.path),
        }
    }
}

#[async_trait]
impl CandidateWriterBackend for JsonlCandidateWriter {
    async fn write_table(
        &mut self,
        table: &CandidateTable,
        params: &ScanParameters,
    ) -> Result<(), WriterError> {
        let mut out = BufWriter::new(self.open()?);

        let header = JsonlRecord::Parameters {
            generated_at: chrono::Utc::now().to_rfc3339(),
            params: *params,
        };
        writeln!(out, "{}", serde_json::to_string(&header)?)?;

        for row in table {
            let record = JsonlRecord::Candidate {
                target_id: row.target_id.clone(),
                egress_time: row.egress_time,
                min_relative_flux: row.min_relative_flux,
            };
            writeln!(out, "{}", serde_json::to_string(&record)?)?;
        }

        out.flush()?;
        log::debug!("✅ Wrote {} candidate record(s) to {}", table.len(), self.path.display());
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "JSONL"
    }
}
