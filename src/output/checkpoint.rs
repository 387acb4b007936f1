//! Periodic checkpoints of a running batch
//!
//! The partial table is written as a CSV artifact to `<path>.partial` and then
//! renamed over `<path>`, so a reader never sees a half-written checkpoint.

use super::csv_writer::{write_header, write_rows};
use super::writer_backend::WriterError;
use crate::detection_core::{CandidateTable, ScanParameters};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct Checkpointer {
    path: PathBuf,
    saves: usize,
}

impl Checkpointer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            saves: 0,
        }
    }

    /// Default checkpoint location next to the final artifact
    pub fn beside(output: &Path) -> Self {
        let mut name = output
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "dips.log".into());
        name.push(".checkpoint");
        Self::new(output.with_file_name(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn saves(&self) -> usize {
        self.saves
    }

    fn partial_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".partial");
        PathBuf::from(name)
    }

    pub fn save(&mut self, table: &CandidateTable, params: &ScanParameters) -> Result<(), WriterError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let partial = self.partial_path();
        {
            let mut out = BufWriter::new(std::fs::File::create(&partial)?);
            write_header(&mut out, params)?;
            write_rows(&mut out, table)?;
            out.flush()?;
        }
        std::fs::rename(&partial, &self.path)?;

        self.saves += 1;
        log::info!(
            "💾 Checkpoint {} saved: {} candidate(s) -> {}",
            self.saves,
            table.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Remove the checkpoint once the final artifact supersedes it
    pub fn clear(&self) -> Result<(), WriterError> {
        for path in [self.path.clone(), self.partial_path()] {
            match std::fs::remove_file(&path) {
                Ok(()) => log::debug!("🧹 Removed checkpoint {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection_core::{DipCandidate, TargetId};
    use crate::output::csv_writer::read_candidates;
    use tempfile::tempdir;

    #[test]
    fn test_save_replaces_and_clear_removes() {
        let dir = tempdir().unwrap();
        let mut checkpoint = Checkpointer::new(dir.path().join("dips.log.checkpoint"));
        let params = ScanParameters::default();

        let mut table = CandidateTable::new();
        table.push(DipCandidate {
            target_id: TargetId::Catalog(3),
            egress_time: 1.5,
            min_relative_flux: 0.9,
        });
        checkpoint.save(&table, &params).unwrap();
        table.push(DipCandidate {
            target_id: TargetId::Catalog(4),
            egress_time: 2.5,
            min_relative_flux: 0.8,
        });
        checkpoint.save(&table, &params).unwrap();

        assert_eq!(checkpoint.saves(), 2);
        assert!(!checkpoint.partial_path().exists());
        assert_eq!(read_candidates(checkpoint.path()).unwrap(), table);

        checkpoint.clear().unwrap();
        assert!(!checkpoint.path().exists());
        // Clearing twice is fine
        checkpoint.clear().unwrap();
    }

    #[test]
    fn test_beside_output() {
        let checkpoint = Checkpointer::beside(Path::new("/runs/k2/dips.log"));
        assert_eq!(checkpoint.path(), Path::new("/runs/k2/dips.log.checkpoint"));
    }
}
