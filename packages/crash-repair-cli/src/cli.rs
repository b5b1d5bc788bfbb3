use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "crash-repair",
    version,
    about = "Repair crash gaps in continuous tracking recordings",
    long_about = "Detect acquisition crashes in tracking CSV files (flip_time, stim_pos, user_pos,\n\
                  crash_count, did_crash), bridge each gap with a bounded smooth transition and\n\
                  resample the result onto a uniform time grid."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Repair a single recording
    Repair(RepairArgs),
    /// Repair every CSV recording matched by a glob or directory
    Batch(BatchArgs),
    /// List detected crash segments without writing output
    Segments(SegmentsArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SmoothingArg {
    /// Savitzky-Golay, polynomial order 3, window up to 15
    Savgol,
    /// Gaussian kernel (see --gaussian-sigma)
    Gaussian,
    Off,
}

/// Repair parameters shared by all subcommands
#[derive(Args, Clone, Debug)]
pub struct RepairOptionsArgs {
    /// JSON file with repair configuration; flags below override it
    #[arg(long, env = "CRASH_REPAIR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Acquisition rate of the recording in Hz
    #[arg(long)]
    pub sampling_rate: Option<f64>,

    /// Pre/post crash window length in seconds
    #[arg(long)]
    pub window_size: Option<f64>,

    /// Fixed amplitude bound for synthesized positions
    #[arg(long, conflicts_with = "auto_max_position")]
    pub max_position: Option<f64>,

    /// Derive the amplitude bound from a percentile of |stim_pos| (default 0.99)
    #[arg(long, num_args = 0..=1, default_missing_value = "0.99")]
    pub auto_max_position: Option<f64>,

    /// Output sampling frequency in Hz
    #[arg(long)]
    pub target_frequency: Option<f64>,

    /// Smoothing applied to synthesized transitions
    #[arg(long, value_enum)]
    pub smoothing: Option<SmoothingArg>,

    /// Sigma (in samples) for --smoothing gaussian
    #[arg(long, default_value_t = 2.0)]
    pub gaussian_sigma: f64,

    /// Negate user_pos before repair (restored in the output)
    #[arg(long, default_value_t = false)]
    pub invert_user: bool,

    /// Remove a linear trend from every output channel
    #[arg(long, default_value_t = false)]
    pub detrend: bool,

    /// Z-score every output channel
    #[arg(long, default_value_t = false)]
    pub zscale: bool,
}

#[derive(Args)]
pub struct RepairArgs {
    /// Input tracking CSV
    #[arg(long)]
    pub input: PathBuf,

    /// Directory for the repaired CSV
    #[arg(long)]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub options: RepairOptionsArgs,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,
}

#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern selecting input files (e.g. "data/*.csv")
    #[arg(long, conflicts_with = "input_dir")]
    pub glob: Option<String>,

    /// Directory whose *.csv files are processed
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Directory for repaired CSVs and repair_summary.json
    #[arg(long)]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub options: RepairOptionsArgs,

    /// Number of worker threads (default: all cores)
    #[arg(long)]
    pub jobs: Option<usize>,

    /// List matched files and exit
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct SegmentsArgs {
    /// Input tracking CSV
    #[arg(long)]
    pub input: PathBuf,

    #[command(flatten)]
    pub options: RepairOptionsArgs,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
