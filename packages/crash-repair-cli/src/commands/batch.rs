use crate::cli::BatchArgs;
use crate::exit_codes;
use crate::output;
use crate::params;
use crash_repair::{process_batch, FileStatus};
use std::path::{Path, PathBuf};
use std::time::Instant;

const SUMMARY_FILE: &str = "repair_summary.json";

pub fn execute(args: BatchArgs) -> i32 {
    let files = match resolve_files(&args) {
        Ok(f) => f,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if files.is_empty() {
        eprintln!("Error: No matching files found");
        return exit_codes::INPUT_ERROR;
    }

    // Dry-run mode: print file list and exit
    if args.dry_run {
        for f in &files {
            println!("{}", f.display());
        }
        if !args.quiet {
            eprintln!("Found {} file(s)", files.len());
        }
        return exit_codes::SUCCESS;
    }

    let options = match params::build_process_options(&args.options) {
        Ok(o) => o,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&args.output_dir) {
        eprintln!(
            "Error: Failed to create output directory '{}': {}",
            args.output_dir.display(),
            e
        );
        return exit_codes::EXECUTION_ERROR;
    }

    let pool = match build_pool(args.jobs) {
        Ok(p) => p,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let start_time = Instant::now();
    let summary = pool.install(|| process_batch(&files, &args.output_dir, &options));
    let elapsed = start_time.elapsed();

    if !args.quiet {
        let total = summary.total;
        for (i, report) in summary.reports.iter().enumerate() {
            match report.status {
                FileStatus::Succeeded => eprintln!(
                    "[{}/{}] {}: {}/{} crash segment(s) repaired",
                    i + 1,
                    total,
                    report.file,
                    report.repaired_segments(),
                    report.segments.len()
                ),
                FileStatus::Failed { ref error } => {
                    eprintln!("[{}/{}] {}: Error: {}", i + 1, total, report.file, error)
                }
            }
        }
    }

    let summary_path = args.output_dir.join(SUMMARY_FILE);
    if let Err(e) = output::emit(&summary, false, Some(&summary_path)) {
        eprintln!("Error writing batch summary: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    if !args.quiet {
        eprintln!(
            "Batch complete: {}/{} succeeded, {}/{} failed, {:.1}s",
            summary.succeeded,
            summary.total,
            summary.failed,
            summary.total,
            elapsed.as_secs_f64()
        );
        eprintln!("Summary written to {}", summary_path.display());
    }

    if summary.failed == 0 {
        exit_codes::SUCCESS
    } else if summary.succeeded > 0 {
        exit_codes::PARTIAL_FAILURE
    } else {
        exit_codes::EXECUTION_ERROR
    }
}

fn build_pool(jobs: Option<usize>) -> Result<rayon::ThreadPool, String> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = jobs {
        if n == 0 {
            return Err("--jobs must be at least 1".to_string());
        }
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| format!("Failed to start worker pool: {}", e))
}

fn resolve_files(args: &BatchArgs) -> Result<Vec<PathBuf>, String> {
    if let Some(ref pattern) = args.glob {
        resolve_glob(pattern)
    } else if let Some(ref dir) = args.input_dir {
        resolve_input_dir(dir)
    } else {
        Err("One of --glob or --input-dir must be specified".to_string())
    }
}

fn resolve_glob(pattern: &str) -> Result<Vec<PathBuf>, String> {
    let paths = glob::glob(pattern)
        .map_err(|e| format!("Invalid glob pattern '{}': {}", pattern, e))?;

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    files.push(path);
                }
            }
            Err(e) => {
                log::warn!("glob error: {}", e);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn resolve_input_dir(dir: &Path) -> Result<Vec<PathBuf>, String> {
    if !dir.is_dir() {
        return Err(format!("Input directory not found: {}", dir.display()));
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| format!("Failed to read input directory '{}': {}", dir.display(), e))?;

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();
    Ok(files)
}
