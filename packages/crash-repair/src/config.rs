//! Repair configuration
//!
//! All fields carry serde defaults so a partial JSON file is a valid config.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{RepairError, Result};
use crate::types::TimeSeries;

pub const DEFAULT_MAX_POSITION: f64 = 0.4;
pub const DEFAULT_PERCENTILE: f64 = 0.99;

/// How the amplitude bound for synthesized samples is chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum MaxPositionPolicy {
    /// Use this bound as-is
    Fixed(f64),
    /// Derive the bound from a quantile of |stim_pos|
    Percentile(f64),
}

impl Default for MaxPositionPolicy {
    fn default() -> Self {
        MaxPositionPolicy::Fixed(DEFAULT_MAX_POSITION)
    }
}

impl MaxPositionPolicy {
    /// The original auto mode: 99th percentile of |stim_pos|
    pub fn auto() -> Self {
        MaxPositionPolicy::Percentile(DEFAULT_PERCENTILE)
    }

    /// Resolve the bound for a particular recording.
    ///
    /// Percentile mode takes `sorted(|stim_pos|)[trunc(n * q)]`. A result that
    /// is not a finite positive number falls back to [`DEFAULT_MAX_POSITION`].
    pub fn resolve(&self, series: &TimeSeries) -> Result<f64> {
        match *self {
            MaxPositionPolicy::Fixed(value) => Ok(value),
            MaxPositionPolicy::Percentile(q) => {
                if series.is_empty() {
                    return Err(RepairError::EmptySeries(
                        "cannot derive max position from an empty series".to_string(),
                    ));
                }

                let mut magnitudes: Vec<f64> = series
                    .samples
                    .iter()
                    .map(|s| s.stim_pos.abs())
                    .filter(|v| v.is_finite())
                    .collect();
                magnitudes.sort_by(f64::total_cmp);

                let resolved = if magnitudes.is_empty() {
                    f64::NAN
                } else {
                    let idx = ((magnitudes.len() as f64 * q) as usize).min(magnitudes.len() - 1);
                    magnitudes[idx]
                };

                if resolved.is_finite() && resolved > 0.0 {
                    Ok(resolved)
                } else {
                    log::warn!(
                        "Percentile {} of |stim_pos| is {}, using default max position {}",
                        q,
                        resolved,
                        DEFAULT_MAX_POSITION
                    );
                    Ok(DEFAULT_MAX_POSITION)
                }
            }
        }
    }
}

/// Smoothing applied to a synthesized transition after dampening
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SmoothingMethod {
    SavitzkyGolay { max_window: usize, polyorder: usize },
    Gaussian { sigma: f64 },
    Off,
}

impl Default for SmoothingMethod {
    fn default() -> Self {
        SmoothingMethod::SavitzkyGolay {
            max_window: 15,
            polyorder: 3,
        }
    }
}

/// Configuration for the crash repair engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairConfig {
    /// Acquisition rate of the recording (Hz)
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,

    /// Width of each pre/post crash window (seconds)
    #[serde(default = "default_window_size")]
    pub window_size: f64,

    #[serde(default)]
    pub max_position: MaxPositionPolicy,

    /// Divisor inside the tanh saturator; larger compresses more gently
    #[serde(default = "default_dampen_scale")]
    pub dampen_scale: f64,

    #[serde(default)]
    pub smoothing: SmoothingMethod,

    /// Rate of the uniformly resampled output (Hz)
    #[serde(default = "default_target_frequency")]
    pub target_frequency: f64,
}

fn default_sampling_rate() -> f64 {
    30.0
}
fn default_window_size() -> f64 {
    3.0
}
fn default_dampen_scale() -> f64 {
    1.5
}
fn default_target_frequency() -> f64 {
    30.0
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            sampling_rate: default_sampling_rate(),
            window_size: default_window_size(),
            max_position: MaxPositionPolicy::default(),
            dampen_scale: default_dampen_scale(),
            smoothing: SmoothingMethod::default(),
            target_frequency: default_target_frequency(),
        }
    }
}

impl RepairConfig {
    /// Load a (possibly partial) config from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RepairError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: RepairConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Window length in frames: `trunc(window_size * sampling_rate)`
    pub fn window_frame_count(&self) -> usize {
        (self.window_size * self.sampling_rate) as usize
    }

    pub fn validate(&self) -> Result<()> {
        check_positive("sampling_rate", self.sampling_rate)?;
        check_positive("window_size", self.window_size)?;
        check_positive("dampen_scale", self.dampen_scale)?;
        check_positive("target_frequency", self.target_frequency)?;

        match self.max_position {
            MaxPositionPolicy::Fixed(value) => check_positive("max_position", value)?,
            MaxPositionPolicy::Percentile(q) => {
                if !(q > 0.0 && q <= 1.0) {
                    return Err(RepairError::InvalidParameter(format!(
                        "max_position percentile must be in (0, 1], got {}",
                        q
                    )));
                }
            }
        }

        match self.smoothing {
            SmoothingMethod::SavitzkyGolay {
                max_window,
                polyorder,
            } => {
                if max_window % 2 == 0 {
                    return Err(RepairError::InvalidParameter(format!(
                        "Savitzky-Golay max_window must be odd, got {}",
                        max_window
                    )));
                }
                if polyorder >= max_window {
                    return Err(RepairError::InvalidParameter(format!(
                        "Savitzky-Golay polyorder ({}) must be less than max_window ({})",
                        polyorder, max_window
                    )));
                }
            }
            SmoothingMethod::Gaussian { sigma } => check_positive("gaussian sigma", sigma)?,
            SmoothingMethod::Off => {}
        }

        Ok(())
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RepairError::InvalidParameter(format!(
            "{} must be a positive number, got {}",
            name, value
        )))
    }
}
