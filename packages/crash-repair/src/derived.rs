//! Derived tracking channels computed on the resampled series

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::types::TimeSeries;

/// One output row: positions plus derived channels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedSample {
    pub flip_time: f64,
    pub stim_pos: f64,
    pub user_pos: f64,
    pub crash_count: i64,
    pub did_crash: bool,
    pub tracking: f64,
    pub covary: f64,
    pub abs_tracking: f64,
    pub abs_covary: f64,
    pub user_pos_vel: f64,
    pub stim_pos_vel: f64,
    pub tracking_vel: f64,
}

/// Column-oriented table of derived channels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedChannels {
    pub flip_time: Vec<f64>,
    pub crash_count: Vec<i64>,
    pub did_crash: Vec<bool>,
    pub stim_pos: Vec<f64>,
    pub user_pos: Vec<f64>,
    pub tracking: Vec<f64>,
    pub covary: Vec<f64>,
    pub abs_tracking: Vec<f64>,
    pub abs_covary: Vec<f64>,
    pub user_pos_vel: Vec<f64>,
    pub stim_pos_vel: Vec<f64>,
    pub tracking_vel: Vec<f64>,
}

impl DerivedChannels {
    pub fn compute(series: &TimeSeries) -> Self {
        let flip_time = series.flip_times();
        let stim_pos = series.stim_positions();
        let user_pos = series.user_positions();

        let tracking: Vec<f64> = user_pos.iter().zip(&stim_pos).map(|(u, s)| u - s).collect();
        let covary: Vec<f64> = user_pos
            .iter()
            .zip(&stim_pos)
            .map(|(u, s)| u.abs() - s.abs())
            .collect();
        let abs_tracking = tracking.iter().map(|v| v.abs()).collect();
        let abs_covary = covary.iter().map(|v| v.abs()).collect();

        Self {
            user_pos_vel: velocity(&user_pos, &flip_time),
            stim_pos_vel: velocity(&stim_pos, &flip_time),
            tracking_vel: velocity(&tracking, &flip_time),
            crash_count: series.samples.iter().map(|s| s.crash_count).collect(),
            did_crash: series.samples.iter().map(|s| s.did_crash).collect(),
            flip_time,
            stim_pos,
            user_pos,
            tracking,
            covary,
            abs_tracking,
            abs_covary,
        }
    }

    pub fn len(&self) -> usize {
        self.flip_time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flip_time.is_empty()
    }

    /// Every continuous channel except the time axis
    fn signal_channels_mut(&mut self) -> [&mut Vec<f64>; 9] {
        [
            &mut self.stim_pos,
            &mut self.user_pos,
            &mut self.tracking,
            &mut self.covary,
            &mut self.abs_tracking,
            &mut self.abs_covary,
            &mut self.user_pos_vel,
            &mut self.stim_pos_vel,
            &mut self.tracking_vel,
        ]
    }

    pub fn detrend(&mut self) {
        for channel in self.signal_channels_mut() {
            detrend_linear(channel);
        }
    }

    pub fn zscale(&mut self) {
        for channel in self.signal_channels_mut() {
            zscale(channel);
        }
    }

    /// Negate the user position column only
    pub fn negate_user(&mut self) {
        for v in &mut self.user_pos {
            *v = -*v;
        }
    }

    pub fn rows(&self) -> Vec<DerivedSample> {
        (0..self.len())
            .map(|i| DerivedSample {
                flip_time: self.flip_time[i],
                stim_pos: self.stim_pos[i],
                user_pos: self.user_pos[i],
                crash_count: self.crash_count[i],
                did_crash: self.did_crash[i],
                tracking: self.tracking[i],
                covary: self.covary[i],
                abs_tracking: self.abs_tracking[i],
                abs_covary: self.abs_covary[i],
                user_pos_vel: self.user_pos_vel[i],
                stim_pos_vel: self.stim_pos_vel[i],
                tracking_vel: self.tracking_vel[i],
            })
            .collect()
    }
}

/// First difference over time difference; 0 for the first row and zero dt
pub fn velocity(values: &[f64], times: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(0.0);
    for i in 1..values.len() {
        let dt = times[i] - times[i - 1];
        out.push(if dt != 0.0 {
            (values[i] - values[i - 1]) / dt
        } else {
            0.0
        });
    }
    out
}

/// Remove the least-squares line through `(index, value)`.
///
/// Indices are centred before solving the normal equations so long channels
/// stay well conditioned. Non-finite channels are left untouched.
pub fn detrend_linear(values: &mut [f64]) {
    let n = values.len();
    if n == 0 || values.iter().any(|v| !v.is_finite()) {
        return;
    }
    let centre = (n as f64 - 1.0) / 2.0;
    let design = DMatrix::from_fn(n, 2, |r, c| if c == 0 { 1.0 } else { r as f64 - centre });
    let observed = DVector::from_column_slice(values);

    let gram = design.transpose() * &design;
    let coefficients = match gram.try_inverse() {
        Some(inverse) => inverse * design.transpose() * observed,
        // a single sample: only the mean can be removed
        None => DVector::from_vec(vec![values.iter().sum::<f64>() / n as f64, 0.0]),
    };

    let trend = &design * coefficients;
    for (v, t) in values.iter_mut().zip(trend.iter()) {
        *v -= t;
    }
}

/// Standardize to zero mean and unit sample standard deviation.
/// Constant or single-value channels are left as-is.
pub fn zscale(values: &mut [f64]) {
    let n = values.len();
    if n < 2 {
        return;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std = var.sqrt();
    if !(std.is_finite() && std > 0.0) {
        return;
    }
    for v in values.iter_mut() {
        *v = (*v - mean) / std;
    }
}
