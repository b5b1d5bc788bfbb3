use clap::Parser;

mod cli;
mod commands;
mod exit_codes;
mod output;
mod params;

use cli::{Cli, Command};

/// Overrides the `-v` level when set, e.g. `CRASH_REPAIR_LOG=crash_repair=debug`
const LOG_ENV: &str = "CRASH_REPAIR_LOG";

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match cli.command {
        Command::Repair(args) => commands::repair::execute(args),
        Command::Batch(args) => commands::batch::execute(args),
        Command::Segments(args) => commands::segments::execute(args),
    };

    std::process::exit(exit_code);
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(verbosity_filter(verbose))
        .format_timestamp(None)
        .format_target(verbose >= 2);
    if let Ok(filters) = std::env::var(LOG_ENV) {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn verbosity_filter(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_filter() {
        assert_eq!(verbosity_filter(0), log::LevelFilter::Warn);
        assert_eq!(verbosity_filter(2), log::LevelFilter::Debug);
        assert_eq!(verbosity_filter(9), log::LevelFilter::Trace);
    }

    #[test]
    fn test_cli_parses_batch_flags() {
        let cli = Cli::try_parse_from([
            "crash-repair",
            "-vv",
            "batch",
            "--input-dir",
            "raw",
            "--output-dir",
            "out",
            "--auto-max-position",
            "--jobs",
            "4",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Batch(args) => {
                assert_eq!(args.jobs, Some(4));
                assert_eq!(args.options.auto_max_position, Some(0.99));
            }
            _ => panic!("expected batch"),
        }
    }
}
