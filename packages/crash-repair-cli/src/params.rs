use crate::cli::{RepairOptionsArgs, SmoothingArg};
use crash_repair::{MaxPositionPolicy, ProcessOptions, RepairConfig, SmoothingMethod};
use std::path::Path;

/// Validate a single input path: existence and CSV extension.
pub fn validate_input_file(path: &Path) -> Result<(), String> {
    if !path.is_file() {
        return Err(format!("Input file not found: {}", path.display()));
    }

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !ext.eq_ignore_ascii_case("csv") {
        return Err(format!(
            "Unsupported file extension '{}'. Supported: csv",
            ext
        ));
    }

    Ok(())
}

/// Build the repair configuration: config file first, then flag overrides.
pub fn build_config(args: &RepairOptionsArgs) -> Result<RepairConfig, String> {
    let mut config = match args.config {
        Some(ref path) => RepairConfig::from_json_file(path)
            .map_err(|e| format!("Failed to load config '{}': {}", path.display(), e))?,
        None => RepairConfig::default(),
    };

    if let Some(rate) = args.sampling_rate {
        config.sampling_rate = rate;
    }
    if let Some(size) = args.window_size {
        config.window_size = size;
    }
    if let Some(freq) = args.target_frequency {
        config.target_frequency = freq;
    }
    if let Some(value) = args.max_position {
        config.max_position = MaxPositionPolicy::Fixed(value);
    }
    if let Some(q) = args.auto_max_position {
        config.max_position = MaxPositionPolicy::Percentile(q);
    }
    if let Some(method) = args.smoothing {
        config.smoothing = match method {
            SmoothingArg::Savgol => SmoothingMethod::default(),
            SmoothingArg::Gaussian => SmoothingMethod::Gaussian {
                sigma: args.gaussian_sigma,
            },
            SmoothingArg::Off => SmoothingMethod::Off,
        };
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

pub fn build_process_options(args: &RepairOptionsArgs) -> Result<ProcessOptions, String> {
    Ok(ProcessOptions {
        config: build_config(args)?,
        invert_user: args.invert_user,
        detrend: args.detrend,
        zscale: args.zscale,
    })
}
