//! Batch runtime configuration from environment variables

use std::env;
use std::path::PathBuf;

pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 50;

/// Runtime knobs of a batch; scan parameters live in `ScanParameters`
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Targets scanned concurrently
    pub workers: usize,

    /// Save a checkpoint after this many targets (0 disables checkpoints)
    pub checkpoint_interval: usize,

    /// Explicit checkpoint location; defaults to `<output>.checkpoint`
    pub checkpoint_path: Option<PathBuf>,

    /// Evaluate window positions of one target on the rayon pool
    pub parallel_windows: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            checkpoint_path: None,
            parallel_windows: false,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl BatchOptions {
    /// Load options from environment variables
    ///
    /// Environment variables:
    /// - `LCPS_WORKERS` (default: available CPU cores)
    /// - `LCPS_CHECKPOINT_INTERVAL` (default: 50)
    /// - `LCPS_CHECKPOINT` (default: unset)
    /// - `LCPS_PARALLEL_WINDOWS` (default: false)
    pub fn from_env() -> Self {
        Self {
            workers: env::var("LCPS_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or_else(default_workers),

            checkpoint_interval: env::var("LCPS_CHECKPOINT_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CHECKPOINT_INTERVAL),

            checkpoint_path: env::var("LCPS_CHECKPOINT").ok().map(PathBuf::from),

            parallel_windows: env::var("LCPS_PARALLEL_WINDOWS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
        }
    }
}
