//! Per-file processing and batch aggregation
//!
//! Each file yields a [`FileReport`]; failures are captured in the report
//! instead of aborting the batch.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::RepairConfig;
use crate::derived::DerivedChannels;
use crate::error::Result;
use crate::io::{read_tracking_csv, write_csv};
use crate::repair::CrashRepair;
use crate::types::{SegmentReport, TimeSeries};

/// Options for processing one recording end to end
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessOptions {
    #[serde(default)]
    pub config: RepairConfig,
    /// Negate `user_pos` before repair and restore it on output
    #[serde(default)]
    pub invert_user: bool,
    #[serde(default)]
    pub detrend: bool,
    #[serde(default)]
    pub zscale: bool,
}

impl ProcessOptions {
    /// Output file name: `<stem>[_detrend][_zscale].csv`
    pub fn output_file_name(&self, input: &Path) -> String {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        let mut name = stem.to_string();
        if self.detrend {
            name.push_str("_detrend");
        }
        if self.zscale {
            name.push_str("_zscale");
        }
        name.push_str(".csv");
        name
    }
}

/// In-memory result of processing one recording
#[derive(Debug, Clone)]
pub struct ProcessedTracking {
    pub channels: DerivedChannels,
    pub segments: Vec<SegmentReport>,
    pub target_max_position: f64,
    pub max_crash_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Succeeded,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub file: String,
    pub subject_id: String,
    #[serde(flatten)]
    pub status: FileStatus,
    pub max_crash_count: Option<i64>,
    pub target_max_position: Option<f64>,
    pub input_rows: Option<usize>,
    pub output_rows: Option<usize>,
    pub output_file: Option<String>,
    pub segments: Vec<SegmentReport>,
}

impl FileReport {
    fn new(input: &Path) -> Self {
        Self {
            file: input.display().to_string(),
            subject_id: subject_id(input),
            status: FileStatus::Succeeded,
            max_crash_count: None,
            target_max_position: None,
            input_rows: None,
            output_rows: None,
            output_file: None,
            segments: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FileStatus::Succeeded
    }

    pub fn repaired_segments(&self) -> usize {
        self.segments.iter().filter(|s| s.status.is_repaired()).count()
    }
}

/// Aggregated outcome of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub created_at: String,
    pub output_dir: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_files: Vec<String>,
    pub reports: Vec<FileReport>,
}

impl BatchSummary {
    pub fn from_reports(output_dir: &Path, reports: Vec<FileReport>) -> Self {
        let failed_files: Vec<String> = reports
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| r.file.clone())
            .collect();
        Self {
            created_at: chrono::Utc::now().to_rfc3339(),
            output_dir: output_dir.display().to_string(),
            total: reports.len(),
            succeeded: reports.len() - failed_files.len(),
            failed: failed_files.len(),
            failed_files,
            reports,
        }
    }
}

/// Subject identifier from a file name: the part before the first `_`,
/// after its last `-` (`sub-1234_task-cst.csv` gives `1234`)
pub fn subject_id(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let head = name.split('_').next().unwrap_or(name);
    head.rsplit('-').next().unwrap_or(head).to_string()
}

/// Repair, resample and derive channels for an in-memory recording
pub fn process_series(mut series: TimeSeries, options: &ProcessOptions) -> Result<ProcessedTracking> {
    let max_crash_count = series.max_crash_count();
    if options.invert_user {
        series.invert_user();
    }

    let engine = CrashRepair::new(options.config.clone(), &series)?;
    let result = engine.repair_and_resample(&series)?;

    let mut channels = DerivedChannels::compute(&result.resampled);
    if options.detrend {
        channels.detrend();
    }
    if options.zscale {
        channels.zscale();
    }
    if options.invert_user {
        channels.negate_user();
    }

    Ok(ProcessedTracking {
        channels,
        segments: result.outcome.segments,
        target_max_position: engine.target_max_position(),
        max_crash_count,
    })
}

/// Process one CSV file into `output_dir`. Never fails; errors land in the report.
pub fn process_file(input: &Path, output_dir: &Path, options: &ProcessOptions) -> FileReport {
    let mut report = FileReport::new(input);
    log::info!("Processing {}", report.file);

    if let Err(e) = run_file(input, output_dir, options, &mut report) {
        log::error!("Failed to process {}: {}", report.file, e);
        report.status = FileStatus::Failed {
            error: e.to_string(),
        };
    }
    report
}

fn run_file(
    input: &Path,
    output_dir: &Path,
    options: &ProcessOptions,
    report: &mut FileReport,
) -> Result<()> {
    let series = read_tracking_csv(input)?;
    report.input_rows = Some(series.len());
    report.max_crash_count = Some(series.max_crash_count());

    let processed = process_series(series, options)?;
    report.target_max_position = Some(processed.target_max_position);
    report.segments = processed.segments;

    let out_path: PathBuf = output_dir.join(options.output_file_name(input));
    write_csv(&out_path, &processed.channels.rows())?;
    report.output_rows = Some(processed.channels.len());
    report.output_file = Some(out_path.display().to_string());
    Ok(())
}

/// Process files in parallel; report order follows `files`
pub fn process_batch(files: &[PathBuf], output_dir: &Path, options: &ProcessOptions) -> BatchSummary {
    let reports: Vec<FileReport> = files
        .par_iter()
        .map(|file| process_file(file, output_dir, options))
        .collect();
    BatchSummary::from_reports(output_dir, reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_id() {
        assert_eq!(subject_id(Path::new("/data/sub-A001_cst_run1.csv")), "A001");
        assert_eq!(subject_id(Path::new("1234_run.csv")), "1234");
        assert_eq!(subject_id(Path::new("plain.csv")), "plain.csv");
    }

    #[test]
    fn test_output_file_name() {
        let mut options = ProcessOptions::default();
        let input = Path::new("/data/sub-1_cst.csv");
        assert_eq!(options.output_file_name(input), "sub-1_cst.csv");
        options.detrend = true;
        options.zscale = true;
        assert_eq!(options.output_file_name(input), "sub-1_cst_detrend_zscale.csv");
    }

    #[test]
    fn test_process_missing_file_reports_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let report = process_file(
            Path::new("/nonexistent_dir_12345/sub-9_x.csv"),
            tmp.path(),
            &ProcessOptions::default(),
        );
        assert!(!report.is_success());
        assert_eq!(report.subject_id, "9");
        assert!(report.output_file.is_none());
    }

    #[test]
    fn test_summary_counts() {
        let ok = FileReport::new(Path::new("a.csv"));
        let mut bad = FileReport::new(Path::new("b.csv"));
        bad.status = FileStatus::Failed {
            error: "boom".to_string(),
        };
        let summary = BatchSummary::from_reports(Path::new("/out"), vec![ok, bad]);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failed_files, vec!["b.csv".to_string()]);
    }
}
