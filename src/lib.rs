//! lcps: sliding-window search for transit-like dips in photometric light curves
//!
//! - [`detection_core`]: local baseline, run-length classifier and window scanner
//! - [`ingest`]: light curve readers (delimited text, JSON, FITS behind `fits`)
//! - [`output`]: CSV, JSONL and SQLite candidate artifacts plus checkpoints
//! - [`batch`]: concurrent multi-target aggregation
//! - [`synthetic`]: seeded Gaussian light curves

pub mod batch;
pub mod detection_core;
pub mod ingest;
pub mod output;
pub mod synthetic;
