use crate::error::{RepairError, Result};
use crate::interp::interp_linear;
use crate::types::{TimeSeries, TrackingSample};

/// Relative tolerance for treating the final timestamp as lying on the grid
const GRID_TOLERANCE: f64 = 1e-9;

/// Largest grid `resample` will build; about 19 days at 30 Hz
pub const MAX_GRID_POINTS: usize = 50_000_000;

/// Resample onto a fixed-step grid starting at the first timestamp.
///
/// Rows with non-finite timestamps are dropped first. The remaining rows keep
/// their order and must be non-decreasing in time with the first timestamp
/// strictly before the last; anything else is an `InvalidTimeRange`.
/// Positions are linearly interpolated; `crash_count` and `did_crash` are
/// held from the last original sample at or before each grid time. The grid
/// excludes the final timestamp unless it falls on a step.
pub fn resample(series: &TimeSeries, target_frequency: f64) -> Result<TimeSeries> {
    if !(target_frequency.is_finite() && target_frequency > 0.0) {
        return Err(RepairError::InvalidParameter(format!(
            "target frequency must be positive, got {}",
            target_frequency
        )));
    }

    let samples = clean_samples(series);
    let (start, end) = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => (first.flip_time, last.flip_time),
        _ => {
            return Err(RepairError::InvalidTimeRange {
                start: f64::NAN,
                end: f64::NAN,
            })
        }
    };
    if start >= end {
        return Err(RepairError::InvalidTimeRange { start, end });
    }
    if let Some(w) = samples.windows(2).find(|w| w[1].flip_time < w[0].flip_time) {
        log::warn!(
            "flip_time steps back from {} to {}",
            w[0].flip_time,
            w[1].flip_time
        );
        return Err(RepairError::InvalidTimeRange {
            start: w[0].flip_time,
            end: w[1].flip_time,
        });
    }

    let grid = uniform_grid(start, end, target_frequency)?;
    let times: Vec<f64> = samples.iter().map(|s| s.flip_time).collect();
    let stim: Vec<f64> = samples.iter().map(|s| s.stim_pos).collect();
    let user: Vec<f64> = samples.iter().map(|s| s.user_pos).collect();

    let resampled = grid
        .into_iter()
        .map(|t| {
            let held = &samples[times.partition_point(|&x| x <= t).saturating_sub(1)];
            TrackingSample {
                flip_time: t,
                stim_pos: interp_linear(t, &times, &stim),
                user_pos: interp_linear(t, &times, &user),
                crash_count: held.crash_count,
                did_crash: held.did_crash,
            }
        })
        .collect();

    Ok(TimeSeries::new(resampled))
}

/// Drop rows without a usable timestamp
fn clean_samples(series: &TimeSeries) -> Vec<TrackingSample> {
    let samples: Vec<TrackingSample> = series
        .samples
        .iter()
        .filter(|s| s.flip_time.is_finite())
        .copied()
        .collect();

    let dropped = series.len() - samples.len();
    if dropped > 0 {
        log::warn!("Dropped {} rows with invalid flip_time values", dropped);
    }
    samples
}

/// `start + i / frequency` for every step before `end`, plus `end` itself
/// when it lands on a step. Fails when the grid would exceed
/// [`MAX_GRID_POINTS`].
pub fn uniform_grid(start: f64, end: f64, frequency: f64) -> Result<Vec<f64>> {
    let step = 1.0 / frequency;
    let span = (end - start) * frequency;
    let nearest = span.round();
    let count = if (span - nearest).abs() <= GRID_TOLERANCE * nearest.max(1.0) {
        nearest + 1.0
    } else {
        span.ceil()
    };

    if !(count.is_finite() && count <= MAX_GRID_POINTS as f64) {
        return Err(RepairError::InvalidParameter(format!(
            "{} to {} s at {} Hz needs {} grid points, limit is {}",
            start, end, frequency, count, MAX_GRID_POINTS
        )));
    }

    Ok((0..count as usize).map(|i| start + i as f64 * step).collect())
}
