//! Batch processing of many light curves
//!
//! Phase layout:
//! 1. `ingest::discover_targets` lists locators
//! 2. [`CandidateAggregator::run`] loads and scans each target, skipping failures
//! 3. [`CandidateAggregator::run_and_persist`] hands the table to a writer and
//!    removes the checkpoint

pub mod aggregator;
pub mod config;

pub use aggregator::{BatchError, BatchReport, CandidateAggregator, TargetFailure};
pub use config::BatchOptions;
