use crate::cli::RepairArgs;
use crate::exit_codes;
use crate::output;
use crate::params;
use crash_repair::process_file;

pub fn execute(args: RepairArgs) -> i32 {
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

    if let Err(e) = std::fs::create_dir_all(&args.output_dir) {
        eprintln!(
            "Error: Failed to create output directory '{}': {}",
            args.output_dir.display(),
            e
        );
        return exit_codes::EXECUTION_ERROR;
    }

    let report = process_file(&args.input, &args.output_dir, &options);

    if let Err(e) = output::emit(&report, args.compact, args.report.as_deref()) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    if report.is_success() {
        exit_codes::SUCCESS
    } else {
        exit_codes::EXECUTION_ERROR
    }
}
