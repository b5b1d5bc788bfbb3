//! Transition synthesis across a crash gap
//!
//! The pre- and post-crash windows are joined, a PCHIP curve is fitted per
//! position channel, and the curve is resampled onto a uniform grid with one
//! point per input sample. Values are then squashed toward the amplitude
//! bound, smoothed and clamped.
//!
//! Recorded timestamps around a crash are often tied or out of order. The
//! fit is attempted on the recorded axis first; if that axis is unusable the
//! fit is retried once on an axis rebuilt from the median frame delta.

use crate::config::{RepairConfig, SmoothingMethod};
use crate::interp::{is_strictly_increasing, linspace, median, Pchip};
use crate::smoothing::smooth;
use crate::types::{AxisKind, TrackingSample, TransitionCurve};

/// Result of synthesizing one transition
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Curve(TransitionCurve),
    /// A window held fewer than two samples
    Insufficient,
    Failed(String),
}

/// Outcome of one fit attempt against a candidate abscissa
enum FitAttempt {
    Fitted { stim: Pchip, user: Pchip },
    NeedsFallback(String),
    Failed(String),
}

/// Rebuild a strictly increasing axis from `times`.
///
/// Every non-positive delta is replaced by the median delta and the axis is
/// re-accumulated from the first timestamp.
pub fn reconstruct_axis(times: &[f64]) -> Vec<f64> {
    if times.is_empty() {
        return Vec::new();
    }
    let deltas: Vec<f64> = times.windows(2).map(|w| w[1] - w[0]).collect();
    let fill = median(&deltas).unwrap_or(0.0);

    let mut axis = Vec::with_capacity(times.len());
    let mut t = times[0];
    axis.push(t);
    for delta in deltas {
        t += if delta > 0.0 { delta } else { fill };
        axis.push(t);
    }
    axis
}

/// Sign-preserving tanh saturation; `|result| < max` for any finite input
pub fn dampen(value: f64, max: f64, scale: f64) -> f64 {
    let normalized = value.abs() / max;
    value.signum() * (normalized / scale).tanh() * max
}

#[derive(Debug, Clone)]
pub struct TransitionSynthesizer {
    target_max_position: f64,
    dampen_scale: f64,
    smoothing: SmoothingMethod,
}

impl TransitionSynthesizer {
    pub fn new(config: &RepairConfig, target_max_position: f64) -> Self {
        Self {
            target_max_position,
            dampen_scale: config.dampen_scale,
            smoothing: config.smoothing,
        }
    }

    pub fn target_max_position(&self) -> f64 {
        self.target_max_position
    }

    /// Synthesize a curve covering `pre ++ post`, one point per sample
    pub fn compute_transition(&self, pre: &[TrackingSample], post: &[TrackingSample]) -> Transition {
        if pre.len() < 2 || post.len() < 2 {
            return Transition::Insufficient;
        }

        let joined: Vec<&TrackingSample> = pre.iter().chain(post).collect();
        let n = joined.len();
        let times: Vec<f64> = joined.iter().map(|s| s.flip_time).collect();
        let stim: Vec<f64> = joined.iter().map(|s| s.stim_pos).collect();
        let user: Vec<f64> = joined.iter().map(|s| s.user_pos).collect();

        let out_start = times[0];
        let out_end = times[n - 1];
        if !(out_start.is_finite() && out_end.is_finite() && out_end > out_start) {
            return Transition::Failed(format!(
                "window spans no time ({} to {})",
                out_start, out_end
            ));
        }

        let (axis, kind, stim_fit, user_fit) =
            match attempt_fit(&times, &stim, &user, AxisKind::Direct) {
                FitAttempt::Fitted { stim, user } => (times, AxisKind::Direct, stim, user),
                FitAttempt::Failed(reason) => return Transition::Failed(reason),
                FitAttempt::NeedsFallback(reason) => {
                    log::debug!("Direct fit unusable ({}), rebuilding time axis", reason);
                    let rebuilt = reconstruct_axis(&times);
                    match attempt_fit(&rebuilt, &stim, &user, AxisKind::Reconstructed) {
                        FitAttempt::Fitted { stim, user } => {
                            (rebuilt, AxisKind::Reconstructed, stim, user)
                        }
                        FitAttempt::NeedsFallback(reason) | FitAttempt::Failed(reason) => {
                            return Transition::Failed(reason)
                        }
                    }
                }
            };

        let grid = linspace(axis[0], axis[n - 1], n);
        let stim_pos = self.bound(&stim_fit.eval_many(&grid));
        let user_pos = self.bound(&user_fit.eval_many(&grid));

        Transition::Curve(TransitionCurve {
            flip_time: linspace(out_start, out_end, n),
            stim_pos,
            user_pos,
            axis: kind,
        })
    }

    /// Dampen, smooth, then clamp so smoothing cannot undo the bound
    fn bound(&self, raw: &[f64]) -> Vec<f64> {
        let max = self.target_max_position;
        let dampened: Vec<f64> = raw
            .iter()
            .map(|&v| dampen(v, max, self.dampen_scale))
            .collect();
        smooth(&self.smoothing, &dampened)
            .into_iter()
            .map(|v| v.clamp(-max, max))
            .collect()
    }
}

fn attempt_fit(axis: &[f64], stim: &[f64], user: &[f64], kind: AxisKind) -> FitAttempt {
    if !is_strictly_increasing(axis) {
        let reason = "time axis is not strictly increasing".to_string();
        return match kind {
            AxisKind::Direct => FitAttempt::NeedsFallback(reason),
            AxisKind::Reconstructed => FitAttempt::Failed(format!("reconstructed {}", reason)),
        };
    }

    let stim = match Pchip::new(axis, stim) {
        Ok(p) => p,
        Err(e) => return FitAttempt::Failed(format!("stim_pos fit failed: {}", e)),
    };
    let user = match Pchip::new(axis, user) {
        Ok(p) => p,
        Err(e) => return FitAttempt::Failed(format!("user_pos fit failed: {}", e)),
    };
    FitAttempt::Fitted { stim, user }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(times: &[f64], value: f64) -> Vec<TrackingSample> {
        times
            .iter()
            .map(|&t| TrackingSample::new(t, value, -value, 0))
            .collect()
    }

    fn synthesizer() -> TransitionSynthesizer {
        TransitionSynthesizer::new(&RepairConfig::default(), 0.4)
    }

    #[test]
    fn test_dampen_bounds_and_sign() {
        let out = dampen(2.0, 0.4, 1.5);
        assert!(out > 0.0 && out < 0.4);
        let out = dampen(-2.0, 0.4, 1.5);
        assert!(out < 0.0 && out > -0.4);
        assert_eq!(dampen(0.0, 0.4, 1.5), 0.0);
        assert!(dampen(1e6, 0.4, 1.5) <= 0.4);
    }

    #[test]
    fn test_reconstruct_axis_replaces_ties() {
        let axis = reconstruct_axis(&[0.0, 0.1, 0.1, 0.2, 0.3]);
        assert!(is_strictly_increasing(&axis));
        assert_eq!(axis[0], 0.0);
        assert!((axis[2] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_reconstruct_axis_replaces_backward_steps() {
        let axis = reconstruct_axis(&[1.0, 1.1, 1.05, 1.2, 1.3]);
        assert!(is_strictly_increasing(&axis));
    }

    #[test]
    fn test_insufficient_windows() {
        let s = synthesizer();
        let one = window(&[0.0], 0.1);
        let two = window(&[1.0, 1.1], 0.1);
        assert_eq!(s.compute_transition(&one, &two), Transition::Insufficient);
        assert_eq!(s.compute_transition(&two, &one), Transition::Insufficient);
    }

    #[test]
    fn test_curve_length_and_axis() {
        let s = synthesizer();
        let pre = window(&[0.0, 0.1, 0.2, 0.3], 0.1);
        let post = window(&[1.0, 1.1, 1.2], 0.2);
        match s.compute_transition(&pre, &post) {
            Transition::Curve(curve) => {
                assert_eq!(curve.len(), 7);
                assert_eq!(curve.axis, AxisKind::Direct);
                assert_eq!(curve.flip_time[0], 0.0);
                assert_eq!(curve.flip_time[6], 1.2);
            }
            other => panic!("expected curve, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_timestamps_use_fallback_axis() {
        let s = synthesizer();
        let pre = window(&[0.0, 0.1, 0.2, 0.2], 0.1);
        let post = window(&[0.2, 0.3, 0.4], 0.2);
        match s.compute_transition(&pre, &post) {
            Transition::Curve(curve) => {
                assert_eq!(curve.axis, AxisKind::Reconstructed);
                assert_eq!(curve.len(), 7);
            }
            other => panic!("expected curve, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_position_fails() {
        let s = synthesizer();
        let pre = window(&[0.0, 0.1], f64::NAN);
        let post = window(&[0.5, 0.6], 0.1);
        assert!(matches!(s.compute_transition(&pre, &post), Transition::Failed(_)));
    }

    #[test]
    fn test_reversed_span_fails() {
        let s = synthesizer();
        let pre = window(&[5.0, 5.1], 0.1);
        let post = window(&[1.0, 1.1], 0.1);
        assert!(matches!(s.compute_transition(&pre, &post), Transition::Failed(_)));
    }

    #[test]
    fn test_large_values_are_bounded() {
        let s = synthesizer();
        let times: Vec<f64> = (0..40).map(|i| i as f64 / 30.0).collect();
        let pre = window(&times[..20], 3.0);
        let post = window(&times[20..], -3.0);
        match s.compute_transition(&pre, &post) {
            Transition::Curve(curve) => {
                for v in curve.stim_pos.iter().chain(&curve.user_pos) {
                    assert!(v.abs() <= 0.4, "value {} exceeds bound", v);
                }
            }
            other => panic!("expected curve, got {:?}", other),
        }
    }
}
