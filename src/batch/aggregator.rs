//! Candidate aggregation across many targets
//!
//! Each target is loaded and scanned on tokio's blocking pool, `workers` at a
//! time. Fragments come back to the single owning task, which appends them in
//! locator order, records ingestion failures and writes checkpoints.

use super::config::BatchOptions;
use crate::detection_core::{CandidateTable, ConfigurationError, ScanParameters, TargetId, WindowScanner};
use crate::ingest::{IngestionError, SeriesSource, TargetLocator};
use crate::output::{CandidateWriter, Checkpointer, WriterError};
use std::sync::Arc;

/// A target skipped because it could not be ingested
#[derive(Debug)]
pub struct TargetFailure {
    pub locator: TargetLocator,
    pub error: IngestionError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub table: CandidateTable,
    pub failures: Vec<TargetFailure>,
    /// Locators handled, failed ones included
    pub targets_processed: usize,
    pub targets_with_candidates: usize,
}

impl BatchReport {
    pub fn targets_scanned(&self) -> usize {
        self.targets_processed - self.failures.len()
    }
}

#[derive(Debug)]
pub enum BatchError {
    Configuration(ConfigurationError),
    Input(std::io::Error),
    Writer(WriterError),
    Task(String),
}

impl From<ConfigurationError> for BatchError {
    fn from(err: ConfigurationError) -> Self {
        BatchError::Configuration(err)
    }
}

impl From<WriterError> for BatchError {
    fn from(err: WriterError) -> Self {
        BatchError::Writer(err)
    }
}

impl From<tokio::task::JoinError> for BatchError {
    fn from(err: tokio::task::JoinError) -> Self {
        BatchError::Task(err.to_string())
    }
}

impl std::fmt::Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchError::Configuration(e) => write!(f, "Invalid scan parameters: {}", e),
            BatchError::Input(e) => write!(f, "Cannot read input: {}", e),
            BatchError::Writer(e) => write!(f, "Cannot write candidates: {}", e),
            BatchError::Task(e) => write!(f, "Scan task failed: {}", e),
        }
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BatchError::Configuration(e) => Some(e),
            BatchError::Input(e) => Some(e),
            BatchError::Writer(e) => Some(e),
            BatchError::Task(_) => None,
        }
    }
}

type TargetOutcome = Result<(TargetId, CandidateTable), IngestionError>;

/// Load and scan one target; runs on a blocking thread
fn scan_target(
    source: &dyn SeriesSource,
    scanner: &WindowScanner,
    locator: &TargetLocator,
    parallel_windows: bool,
) -> TargetOutcome {
    let (target_id, series) = source.load(locator)?;
    let table = if parallel_windows {
        scanner.scan_parallel(&series)
    } else {
        scanner.scan(&series)
    };
    Ok((target_id, table))
}

pub struct CandidateAggregator {
    source: Arc<dyn SeriesSource>,
    scanner: Arc<WindowScanner>,
    params: ScanParameters,
    options: BatchOptions,
    checkpointer: Option<Checkpointer>,
}

impl CandidateAggregator {
    /// Fails with [`ConfigurationError`] before any target is touched
    pub fn new(
        source: Arc<dyn SeriesSource>,
        params: ScanParameters,
        options: BatchOptions,
    ) -> Result<Self, ConfigurationError> {
        let scanner = WindowScanner::new(params)?;
        Ok(Self {
            source,
            scanner: Arc::new(scanner),
            params,
            options,
            checkpointer: None,
        })
    }

    pub fn with_checkpointer(mut self, checkpointer: Checkpointer) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn params(&self) -> &ScanParameters {
        &self.params
    }

    pub fn checkpointer(&self) -> Option<&Checkpointer> {
        self.checkpointer.as_ref()
    }

    /// Scan every locator and collect candidates in locator order
    pub async fn run(&mut self, locators: &[TargetLocator]) -> Result<BatchReport, BatchError> {
        let total = locators.len();
        let workers = self.options.workers.max(1);
        let mut report = BatchReport::default();

        log::info!(
            "🚀 Scanning {} target(s) with {} worker(s) (win_size={}, step_size={}, neighbor_count={}, min_dur={}, max_dur={}, detection_thresh={})",
            total,
            workers,
            self.params.win_size,
            self.params.step_size,
            self.params.neighbor_count,
            self.params.min_dur,
            self.params.max_dur,
            self.params.detection_thresh
        );

        for (chunk_idx, chunk) in locators.chunks(workers).enumerate() {
            let mut handles = Vec::with_capacity(chunk.len());
            for (offset, locator) in chunk.iter().enumerate() {
                log::info!(
                    "🔭 Scanning target {}/{}: {}",
                    chunk_idx * workers + offset + 1,
                    total,
                    locator
                );
                let source = Arc::clone(&self.source);
                let scanner = Arc::clone(&self.scanner);
                let locator = locator.clone();
                let parallel = self.options.parallel_windows;
                handles.push(tokio::task::spawn_blocking(move || {
                    scan_target(source.as_ref(), &scanner, &locator, parallel)
                }));
            }

            for (handle, locator) in handles.into_iter().zip(chunk) {
                let outcome = handle.await?;
                self.merge(&mut report, locator, outcome);
                self.maybe_checkpoint(&report, total);
            }
        }

        log::info!(
            "✅ Batch complete: {} candidate(s) from {}/{} target(s), {} failed",
            report.table.len(),
            report.targets_with_candidates,
            report.targets_processed,
            report.failures.len()
        );
        Ok(report)
    }

    /// Run the batch, write the final artifact, then drop the checkpoint it supersedes
    pub async fn run_and_persist(
        &mut self,
        locators: &[TargetLocator],
        writer: &mut CandidateWriter,
    ) -> Result<BatchReport, BatchError> {
        let report = self.run(locators).await?;
        writer.write_table(&report.table, &self.params).await?;
        log::info!(
            "💾 Wrote {} candidate(s) via {} backend",
            report.table.len(),
            writer.backend_type()
        );

        if let Some(checkpointer) = &self.checkpointer {
            if let Err(e) = checkpointer.clear() {
                log::warn!("⚠️  Could not remove checkpoint {}: {}", checkpointer.path().display(), e);
            }
        }
        Ok(report)
    }

    fn merge(&self, report: &mut BatchReport, locator: &TargetLocator, outcome: TargetOutcome) {
        report.targets_processed += 1;
        match outcome {
            Ok((target_id, mut fragment)) => {
                if !fragment.is_empty() {
                    report.targets_with_candidates += 1;
                    log::info!("   └─ {}: {} dip(s)", target_id, fragment.len());
                } else {
                    log::debug!("   └─ {}: no dips", target_id);
                }
                report.table.append(&mut fragment);
            }
            Err(error) => {
                log::warn!("⚠️  Skipping {} ({}): {}", locator, error.kind(), error);
                report.failures.push(TargetFailure {
                    locator: locator.clone(),
                    error,
                });
            }
        }
    }

    fn maybe_checkpoint(&mut self, report: &BatchReport, total: usize) {
        let interval = self.options.checkpoint_interval;
        let processed = report.targets_processed;
        if interval == 0 || processed % interval != 0 || processed == total {
            return;
        }
        if let Some(checkpointer) = self.checkpointer.as_mut() {
            if let Err(e) = checkpointer.save(&report.table, &self.params) {
                log::warn!("⚠️  Checkpoint after {} target(s) failed: {}", processed, e);
            }
        }
    }
}
