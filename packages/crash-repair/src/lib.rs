pub mod batch;
pub mod config;
pub mod derived;
pub mod error;
pub mod interp;
pub mod io;
pub mod repair;
pub mod resample;
pub mod segments;
pub mod smoothing;
pub mod transition;
pub mod types;

pub use batch::{
    process_batch, process_file, process_series, BatchSummary, FileReport, FileStatus,
    ProcessOptions, ProcessedTracking,
};
pub use config::{MaxPositionPolicy, RepairConfig, SmoothingMethod};
pub use derived::{DerivedChannels, DerivedSample};
pub use error::{RepairError, Result};
pub use io::{read_tracking, read_tracking_csv, write_csv, write_tracking_csv};
pub use repair::{CrashRepair, RepairOutcome, ResampledRepair};
pub use resample::resample;
pub use segments::find_crash_segments;
pub use transition::{Transition, TransitionSynthesizer};
pub use types::*;
