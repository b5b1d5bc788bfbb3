use std::ops::Range;

use crate::config::RepairConfig;
use crate::error::Result;
use crate::resample::resample;
use crate::segments::find_crash_segments;
use crate::transition::{Transition, TransitionSynthesizer};
use crate::types::{CrashSegment, SegmentReport, SegmentStatus, TimeSeries};

/// Spliced series plus what happened to each crash segment
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub repaired: TimeSeries,
    pub segments: Vec<SegmentReport>,
}

impl RepairOutcome {
    pub fn repaired_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|r| r.status.is_repaired())
            .count()
    }
}

/// Repair followed by uniform resampling
#[derive(Debug, Clone)]
pub struct ResampledRepair {
    pub outcome: RepairOutcome,
    pub resampled: TimeSeries,
}

/// Crash repair engine
///
/// Holds a validated configuration and the amplitude bound resolved for one
/// recording.
#[derive(Debug, Clone)]
pub struct CrashRepair {
    config: RepairConfig,
    synthesizer: TransitionSynthesizer,
}

impl CrashRepair {
    /// Validate `config` and resolve its max-position policy against `series`
    pub fn new(config: RepairConfig, series: &TimeSeries) -> Result<Self> {
        config.validate()?;
        let target_max_position = config.max_position.resolve(series)?;
        log::info!("Target max position: {:.4}", target_max_position);
        Ok(Self::build(config, target_max_position))
    }

    fn build(config: RepairConfig, target_max_position: f64) -> Self {
        let synthesizer = TransitionSynthesizer::new(&config, target_max_position);
        Self {
            config,
            synthesizer,
        }
    }

    pub fn config(&self) -> &RepairConfig {
        &self.config
    }

    pub fn target_max_position(&self) -> f64 {
        self.synthesizer.target_max_position()
    }

    pub fn synthesizer(&self) -> &TransitionSynthesizer {
        &self.synthesizer
    }

    pub fn find_crash_segments(&self, series: &TimeSeries) -> Vec<CrashSegment> {
        find_crash_segments(
            series,
            self.config.window_frame_count(),
            self.config.sampling_rate,
        )
    }

    /// Splice synthesized transitions over every repairable crash.
    ///
    /// Works on a copy; the input is untouched. Segments are handled in index
    /// order and a segment overlapping one already spliced is skipped.
    pub fn repair_tracking(&self, series: &TimeSeries) -> RepairOutcome {
        let mut repaired = series.clone();
        let mut spliced: Vec<Range<usize>> = Vec::new();
        let mut reports = Vec::new();

        for segment in self.find_crash_segments(series) {
            let status = if spliced.iter().any(|r| segment.overlaps(r)) {
                log::warn!(
                    "Crash at index {} overlaps a repaired window, leaving it unrepaired",
                    segment.crash_index
                );
                SegmentStatus::Overlapping
            } else {
                let status = self.repair_segment(series, &mut repaired, &segment);
                if status.is_repaired() {
                    spliced.push(segment.span());
                }
                status
            };

            reports.push(SegmentReport { segment, status });
        }

        RepairOutcome {
            repaired,
            segments: reports,
        }
    }

    fn repair_segment(
        &self,
        original: &TimeSeries,
        working: &mut TimeSeries,
        segment: &CrashSegment,
    ) -> SegmentStatus {
        let pre = original.window(segment.pre_window.clone());
        let post = original.window(segment.post_window.clone());

        let curve = match self.synthesizer.compute_transition(pre, post) {
            Transition::Curve(curve) => curve,
            Transition::Insufficient => {
                log::debug!(
                    "Crash at index {}: not enough samples around the gap",
                    segment.crash_index
                );
                return SegmentStatus::InsufficientData;
            }
            Transition::Failed(reason) => {
                log::warn!(
                    "Crash at index {}: transition fit failed: {}",
                    segment.crash_index,
                    reason
                );
                return SegmentStatus::FitFailed { reason };
            }
        };

        let span = segment.span();
        if curve.len() != span.len() {
            log::warn!(
                "Mismatch in transition length {} vs window length {}",
                curve.len(),
                span.len()
            );
            return SegmentStatus::LengthMismatch {
                expected: span.len(),
                actual: curve.len(),
            };
        }

        let held_count = if span.start > 0 {
            working.samples[span.start - 1].crash_count
        } else {
            0
        };

        for (offset, sample) in working.samples[span].iter_mut().enumerate() {
            sample.flip_time = curve.flip_time[offset];
            sample.stim_pos = curve.stim_pos[offset];
            sample.user_pos = curve.user_pos[offset];
            sample.did_crash = false;
            sample.crash_count = held_count;
        }

        log::debug!(
            "Crash at index {} repaired ({:?} axis)",
            segment.crash_index,
            curve.axis
        );
        SegmentStatus::Repaired { axis: curve.axis }
    }

    /// Repair, then resample onto the configured target frequency
    pub fn repair_and_resample(&self, series: &TimeSeries) -> Result<ResampledRepair> {
        let outcome = self.repair_tracking(series);
        let resampled = resample(&outcome.repaired, self.config.target_frequency)?;
        log::info!(
            "Repaired {}/{} crash segments, resampled {} -> {} samples",
            outcome.repaired_count(),
            outcome.segments.len(),
            outcome.repaired.len(),
            resampled.len()
        );
        Ok(ResampledRepair { outcome, resampled })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaxPositionPolicy;
    use crate::types::{AxisKind, TrackingSample};

    fn config(window_size: f64) -> RepairConfig {
        RepairConfig {
            window_size,
            ..Default::default()
        }
    }

    /// 30 Hz sinusoid tracking with crash_count stepping at `steps`
    fn tracking_series(n: usize, steps: &[usize], gap: f64) -> TimeSeries {
        let mut count = 0;
        let mut offset = 0.0;
        (0..n)
            .map(|i| {
                if steps.contains(&i) {
                    count += 1;
                    offset += gap;
                }
                let t = i as f64 / 30.0 + offset;
                let mut s = TrackingSample::new(t, 0.3 * t.sin(), 0.25 * (t + 0.2).sin(), count);
                s.did_crash = steps.contains(&i);
                s
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_no_crash_is_identity() {
        let series = tracking_series(120, &[], 0.0);
        let engine = CrashRepair::new(config(1.0), &series).unwrap();
        let outcome = engine.repair_tracking(&series);
        assert!(outcome.segments.is_empty());
        assert_eq!(outcome.repaired, series);
    }

    #[test]
    fn test_single_crash_repaired() {
        let series = tracking_series(100, &[50], 0.5);
        let engine = CrashRepair::new(config(1.0), &series).unwrap();
        let outcome = engine.repair_tracking(&series);

        assert_eq!(outcome.segments.len(), 1);
        let report = &outcome.segments[0];
        assert_eq!(report.segment.pre_window, 20..50);
        assert_eq!(report.segment.post_window, 50..80);
        assert_eq!(report.status, SegmentStatus::Repaired { axis: AxisKind::Direct });

        for sample in &outcome.repaired.samples[20..80] {
            assert!(!sample.did_crash);
            assert_eq!(sample.crash_count, 0);
            assert!(sample.stim_pos.abs() <= 0.4);
            assert!(sample.user_pos.abs() <= 0.4);
        }
        // untouched outside the window
        assert_eq!(outcome.repaired.samples[..20], series.samples[..20]);
        assert_eq!(outcome.repaired.samples[80..], series.samples[80..]);
    }

    #[test]
    fn test_crash_count_held_from_previous_sample() {
        let series = tracking_series(300, &[40, 200], 0.3);
        let engine = CrashRepair::new(config(1.0), &series).unwrap();
        let outcome = engine.repair_tracking(&series);

        assert_eq!(outcome.repaired_count(), 2);
        for sample in &outcome.repaired.samples[170..230] {
            assert_eq!(sample.crash_count, 1);
        }
        for sample in &outcome.repaired.samples[10..70] {
            assert_eq!(sample.crash_count, 0);
        }
    }

    #[test]
    fn test_window_at_series_start_uses_zero_count() {
        let mut series = tracking_series(100, &[10], 0.2);
        for sample in &mut series.samples {
            sample.crash_count += 3;
        }
        let engine = CrashRepair::new(config(1.0), &series).unwrap();
        let outcome = engine.repair_tracking(&series);
        assert!(outcome.segments[0].status.is_repaired());
        assert_eq!(outcome.segments[0].segment.pre_window, 0..10);
        assert_eq!(outcome.repaired.samples[0].crash_count, 0);
    }

    #[test]
    fn test_insufficient_window_left_unmodified() {
        let series = tracking_series(100, &[1], 0.2);
        let engine = CrashRepair::new(config(1.0), &series).unwrap();
        let outcome = engine.repair_tracking(&series);
        assert_eq!(outcome.segments[0].status, SegmentStatus::InsufficientData);
        assert_eq!(outcome.repaired, series);
    }

    #[test]
    fn test_unfittable_time_axis_left_unmodified() {
        // stalled clock: the median frame delta around the crash is zero,
        // so the rebuilt axis is no better than the recorded one
        let times = [0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.2, 1.3, 1.4];
        let series: TimeSeries = times
            .iter()
            .enumerate()
            .map(|(i, &t)| TrackingSample::new(t, 0.1 * i as f64, -0.1, i64::from(i >= 4)))
            .collect::<Vec<_>>()
            .into();
        let engine = CrashRepair::new(config(0.1), &series).unwrap();
        let outcome = engine.repair_tracking(&series);

        assert_eq!(outcome.segments.len(), 1);
        assert_eq!(outcome.segments[0].segment.span(), 1..7);
        match &outcome.segments[0].status {
            SegmentStatus::FitFailed { reason } => assert!(reason.contains("reconstructed")),
            other => panic!("expected FitFailed, got {:?}", other),
        }
        assert_eq!(outcome.repaired, series);
    }

    #[test]
    fn test_non_finite_position_left_unmodified() {
        let mut series = tracking_series(100, &[50], 0.5);
        series.samples[45].stim_pos = f64::NAN;
        let engine = CrashRepair::new(config(1.0), &series).unwrap();
        let outcome = engine.repair_tracking(&series);

        match &outcome.segments[0].status {
            SegmentStatus::FitFailed { reason } => assert!(reason.contains("stim_pos")),
            other => panic!("expected FitFailed, got {:?}", other),
        }
        assert_eq!(outcome.repaired_count(), 0);
        for (repaired, original) in outcome.repaired.samples.iter().zip(&series.samples) {
            assert_eq!(repaired.flip_time, original.flip_time);
            assert_eq!(repaired.stim_pos.to_bits(), original.stim_pos.to_bits());
            assert_eq!(repaired.user_pos, original.user_pos);
            assert_eq!(repaired.crash_count, original.crash_count);
            assert_eq!(repaired.did_crash, original.did_crash);
        }
    }

    #[test]
    fn test_overlapping_segments_rejected() {
        let series = tracking_series(200, &[60, 80], 0.2);
        let engine = CrashRepair::new(config(1.0), &series).unwrap();
        let outcome = engine.repair_tracking(&series);

        assert_eq!(outcome.segments.len(), 2);
        assert!(outcome.segments[0].status.is_repaired());
        assert_eq!(outcome.segments[1].status, SegmentStatus::Overlapping);
        // second crash keeps its original samples beyond the first window
        assert_eq!(outcome.repaired.samples[90..110], series.samples[90..110]);
    }

    #[test]
    fn test_percentile_policy_resolved_at_construction() {
        let series = tracking_series(300, &[150], 0.3);
        let cfg = RepairConfig {
            max_position: MaxPositionPolicy::auto(),
            ..config(1.0)
        };
        let engine = CrashRepair::new(cfg, &series).unwrap();
        assert!(engine.target_max_position() > 0.0);
        assert!(engine.target_max_position() <= 0.3);

        let outcome = engine.repair_tracking(&series);
        let bound = engine.target_max_position();
        for sample in &outcome.repaired.samples[120..180] {
            assert!(sample.stim_pos.abs() <= bound);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let series = tracking_series(10, &[], 0.0);
        let cfg = RepairConfig {
            sampling_rate: -1.0,
            ..Default::default()
        };
        assert!(CrashRepair::new(cfg, &series).is_err());
    }

    #[test]
    fn test_repair_and_resample() {
        let series = tracking_series(100, &[50], 0.5);
        let engine = CrashRepair::new(config(1.0), &series).unwrap();
        let result = engine.repair_and_resample(&series).unwrap();
        let times = result.resampled.flip_times();
        for w in times.windows(2) {
            assert!((w[1] - w[0] - 1.0 / 30.0).abs() < 1e-9);
        }
        assert!(result.resampled.len() > 100);
    }
}
