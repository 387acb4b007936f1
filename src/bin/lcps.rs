//! lcps - batch dip search over light curve files
//!
//! ## Usage
//!
//! ```bash
//! lcps scan data/k2_c4/ --output dips.log
//! lcps scan data/k2_c4/ --backend sqlite --output data/dips.db --append
//! lcps synth demo.csv --dip-at 500 --dip-len 3 --dip-depth 0.97
//! ```
//!
//! ## Environment Variables
//!
//! - LCPS_WIN_SIZE, LCPS_STEP_SIZE, LCPS_NEIGHBOR_COUNT, LCPS_MIN_DUR,
//!   LCPS_MAX_DUR, LCPS_DETECTION_THRESH - scan parameters
//! - LCPS_WORKERS - targets scanned concurrently (default: CPU cores)
//! - LCPS_CHECKPOINT_INTERVAL - targets between checkpoints (default: 50, 0 disables)
//! - LCPS_CHECKPOINT - checkpoint path (default: `<output>.checkpoint`)
//! - LCPS_PARALLEL_WINDOWS - evaluate windows on the rayon pool (default: false)
//! - RUST_LOG - Logging level (optional, default: info)

use clap::{Args, Parser, Subcommand};
use lcps::batch::{BatchError, BatchOptions, CandidateAggregator};
use lcps::detection_core::params::{
    DEFAULT_DETECTION_THRESH, DEFAULT_MAX_DUR, DEFAULT_MIN_DUR, DEFAULT_NEIGHBOR_COUNT,
    DEFAULT_STEP_SIZE, DEFAULT_WIN_SIZE,
};
use lcps::detection_core::{ScanParameters, TargetId};
use lcps::ingest::{discover_targets, delimited::write_delimited_series, FileSeriesSource};
use lcps::output::{BackendType, CandidateWriter, Checkpointer, WriteMode};
use lcps::synthetic::{self, SyntheticSpec};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "lcps")]
#[command(about = "Search photometric light curves for short transit-like dips")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a light curve file or a directory of them.
    Scan(ScanArgs),

    /// Write a seeded synthetic light curve, optionally with a dip.
    Synth(SynthArgs),
}

#[derive(Debug, Clone, Args)]
struct ScanArgs {
    /// Light curve file or directory (not searched recursively).
    input: PathBuf,

    /// Candidate artifact path.
    #[arg(long, short, default_value = "./dips.log")]
    output: PathBuf,

    /// Output backend: csv, jsonl or sqlite.
    #[arg(long, default_value = "csv")]
    backend: BackendType,

    /// Append to the existing artifact instead of overwriting it.
    #[arg(long)]
    append: bool,

    /// Samples per sliding window.
    #[arg(long, env = "LCPS_WIN_SIZE", default_value_t = DEFAULT_WIN_SIZE)]
    win_size: usize,

    /// Samples the window advances per step.
    #[arg(long, env = "LCPS_STEP_SIZE", default_value_t = DEFAULT_STEP_SIZE)]
    step_size: usize,

    /// Neighbouring windows per side used for the local median.
    #[arg(long, env = "LCPS_NEIGHBOR_COUNT", default_value_t = DEFAULT_NEIGHBOR_COUNT)]
    neighbor_count: usize,

    /// Minimum dip duration in samples.
    #[arg(long, env = "LCPS_MIN_DUR", default_value_t = DEFAULT_MIN_DUR)]
    min_dur: usize,

    /// Maximum dip duration in samples.
    #[arg(long, env = "LCPS_MAX_DUR", default_value_t = DEFAULT_MAX_DUR)]
    max_dur: usize,

    /// Fraction of the local median below which a sample counts as low.
    #[arg(long, env = "LCPS_DETECTION_THRESH", default_value_t = DEFAULT_DETECTION_THRESH)]
    detection_thresh: f64,

    /// Targets scanned concurrently.
    #[arg(long)]
    workers: Option<usize>,

    /// Targets between checkpoints (0 disables).
    #[arg(long)]
    checkpoint_interval: Option<usize>,

    /// Checkpoint path.
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Evaluate window positions in parallel.
    #[arg(long)]
    parallel_windows: bool,
}

impl ScanArgs {
    fn scan_parameters(&self) -> ScanParameters {
        ScanParameters {
            win_size: self.win_size,
            step_size: self.step_size,
            neighbor_count: self.neighbor_count,
            min_dur: self.min_dur,
            max_dur: self.max_dur,
            detection_thresh: self.detection_thresh,
        }
    }

    /// Environment options overridden by explicit flags
    fn batch_options(&self) -> BatchOptions {
        let mut options = BatchOptions::from_env();
        if let Some(workers) = self.workers {
            options.workers = workers.max(1);
        }
        if let Some(interval) = self.checkpoint_interval {
            options.checkpoint_interval = interval;
        }
        if let Some(path) = &self.checkpoint {
            options.checkpoint_path = Some(path.clone());
        }
        options.parallel_windows |= self.parallel_windows;
        options
    }
}

#[derive(Debug, Clone, Args)]
struct SynthArgs {
    /// Output light curve (CSV).
    output: PathBuf,

    #[arg(long, default_value_t = synthetic::DEFAULT_SAMPLES)]
    samples: usize,

    #[arg(long, default_value_t = synthetic::DEFAULT_MEAN)]
    mean: f64,

    /// Standard deviation of the Gaussian noise.
    #[arg(long, default_value_t = synthetic::DEFAULT_SCALE)]
    scale: f64,

    #[arg(long, default_value_t = synthetic::DEFAULT_SEED)]
    seed: u64,

    #[arg(long, default_value_t = synthetic::DEFAULT_CADENCE)]
    cadence: f64,

    /// Target id written to the file header.
    #[arg(long, default_value = "synthetic")]
    target_id: String,

    /// First sample of an inserted dip.
    #[arg(long)]
    dip_at: Option<usize>,

    /// Dip length in samples.
    #[arg(long, default_value_t = 3)]
    dip_len: usize,

    /// Remaining flux fraction inside the dip.
    #[arg(long, default_value_t = 0.98)]
    dip_depth: f64,
}

async fn run_scan(args: ScanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let params = args.scan_parameters();
    let options = args.batch_options();

    let checkpointer = match (&options.checkpoint_path, options.checkpoint_interval) {
        (_, 0) => None,
        (Some(path), _) => Some(Checkpointer::new(path)),
        (None, _) => Some(Checkpointer::beside(&args.output)),
    };

    // Invalid parameters end the run before any file is read
    let mut aggregator =
        CandidateAggregator::new(Arc::new(FileSeriesSource::new()), params, options)?;
    if let Some(checkpointer) = checkpointer {
        aggregator = aggregator.with_checkpointer(checkpointer);
    }

    let locators = discover_targets(&args.input).map_err(|e| {
        log::error!("❌ Cannot read input {}: {}", args.input.display(), e);
        BatchError::Input(e)
    })?;
    if locators.is_empty() {
        log::warn!("⚠️  No light curves found in {}", args.input.display());
    }

    let mode = WriteMode::from_append_flag(args.append);
    let mut writer = CandidateWriter::new(args.backend, args.output.clone(), mode)?;

    let report = aggregator.run_and_persist(&locators, &mut writer).await?;

    log::info!("📊 Summary");
    log::info!("   ├─ Targets processed: {}", report.targets_processed);
    log::info!("   ├─ Targets with dips: {}", report.targets_with_candidates);
    log::info!("   ├─ Candidates: {}", report.table.len());
    log::info!("   └─ Failed targets: {}", report.failures.len());
    for failure in &report.failures {
        log::warn!("      {} ({})", failure.locator, failure.error.kind());
    }

    Ok(())
}

fn run_synth(args: SynthArgs) -> Result<(), Box<dyn std::error::Error>> {
    let spec = SyntheticSpec {
        target_id: TargetId::parse(&args.target_id),
        samples: args.samples,
        mean: args.mean,
        scale: args.scale,
        cadence: args.cadence,
        seed: args.seed,
    };
    let mut series = synthetic::gaussian_series(&spec)?;
    if let Some(start) = args.dip_at {
        series = synthetic::insert_dip(&series, start, args.dip_len, args.dip_depth)?;
        log::info!(
            "🕳️  Inserted {}-sample dip at {} (depth {})",
            args.dip_len,
            start,
            args.dip_depth
        );
    }

    write_delimited_series(&args.output, &series)?;
    log::info!(
        "✅ Wrote {} samples for {} to {}",
        series.len(),
        series.target_id(),
        args.output.display()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => run_scan(args).await,
        Commands::Synth(args) => run_synth(args),
    }
}
