use crate::cli::SegmentsArgs;
use crate::exit_codes;
use crate::output;
use crate::params;
use crash_repair::{read_tracking_csv, CrashRepair, SegmentReport, SegmentStatus};
use serde::Serialize;

#[derive(Serialize)]
struct SegmentListing<'a> {
    file: String,
    samples: usize,
    target_max_position: f64,
    segments: &'a [SegmentReport],
}

pub fn execute(args: SegmentsArgs) -> i32 {
    if let Err(msg) = params::validate_input_file(&args.input) {
        eprintln!("Error: {}", msg);
        return exit_codes::INPUT_ERROR;
    }

    let options = match params::build_process_options(&args.options) {
        Ok(o) => o,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let mut series = match read_tracking_csv(&args.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };
    if options.invert_user {
        series.invert_user();
    }

    let engine = match CrashRepair::new(options.config, &series) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };
    let outcome = engine.repair_tracking(&series);

    if args.json {
        let listing = SegmentListing {
            file: args.input.display().to_string(),
            samples: series.len(),
            target_max_position: engine.target_max_position(),
            segments: &outcome.segments,
        };
        return match output::emit(&listing, false, None) {
            Ok(()) => exit_codes::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                exit_codes::EXECUTION_ERROR
            }
        };
    }

    println!(
        "{}: {} sample(s), {} crash segment(s), max position {:.4}",
        args.input.display(),
        series.len(),
        outcome.segments.len(),
        engine.target_max_position()
    );
    if !outcome.segments.is_empty() {
        println!(
            "{:>8}  {:>15}  {:>15}  {:>9}  {:>7}  status",
            "crash", "pre", "post", "gap (s)", "missed"
        );
    }
    for report in &outcome.segments {
        let seg = &report.segment;
        println!(
            "{:>8}  {:>15}  {:>15}  {:>9.3}  {:>7}  {}{}",
            seg.crash_index,
            format!("{}..{}", seg.pre_window.start, seg.pre_window.end),
            format!("{}..{}", seg.post_window.start, seg.post_window.end),
            seg.gap_duration,
            seg.missing_frame_count,
            describe_status(&report.status),
            if seg.is_partial { " (partial)" } else { "" }
        );
    }

    exit_codes::SUCCESS
}

fn describe_status(status: &SegmentStatus) -> String {
    match status {
        SegmentStatus::Repaired { axis } => format!("repaired ({:?} axis)", axis).to_lowercase(),
        SegmentStatus::InsufficientData => "insufficient data".to_string(),
        SegmentStatus::FitFailed { reason } => format!("fit failed: {}", reason),
        SegmentStatus::LengthMismatch { expected, actual } => {
            format!("length mismatch: expected {}, got {}", expected, actual)
        }
        SegmentStatus::Overlapping => "skipped (overlaps previous segment)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crash_repair::AxisKind;

    #[test]
    fn test_describe_status() {
        assert_eq!(
            describe_status(&SegmentStatus::Repaired {
                axis: AxisKind::Reconstructed
            }),
            "repaired (reconstructed axis)"
        );
        assert_eq!(
            describe_status(&SegmentStatus::LengthMismatch {
                expected: 60,
                actual: 59
            }),
            "length mismatch: expected 60, got 59"
        );
        assert!(describe_status(&SegmentStatus::InsufficientData).contains("insufficient"));
    }
}
