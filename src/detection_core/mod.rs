//! Detection Core - Sliding-Window Dip Search
//!
//! Finds short, significant drops in flux in a single light curve.
//!
//! # Architecture
//!
//! ```text
//! PhotometrySeries
//!     ↓  (every step_size samples)
//! WindowView [start, start + win_size)
//!     ↓
//! estimate_local_stats (median + MAD of neighbouring windows, window excluded)
//!     ↓
//! DipClassifier (first run of low samples with min_dur <= length <= max_dur)
//!     ↓
//! WindowScanner dedup gate (egress separation > min_dur * cadence)
//!     ↓
//! CandidateTable
//! ```

pub mod candidate;
pub mod classifier;
pub mod params;
pub mod scanner;
pub mod series;
pub mod stats;

pub use candidate::{CandidateTable, DipCandidate};
pub use classifier::{DipClassifier, DipResult, WindowView};
pub use params::{ConfigurationError, ScanParameters};
pub use scanner::WindowScanner;
pub use series::{PhotometrySeries, Sample, SeriesError, TargetId};
pub use stats::{estimate_local_stats, EstimatorError, LocalStats};
