use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::io::{lenient_bool, lenient_count, lenient_f64};

/// One row of a tracking recording
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackingSample {
    /// Presentation timestamp in seconds
    #[serde(deserialize_with = "lenient_f64")]
    pub flip_time: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub stim_pos: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub user_pos: f64,
    /// Number of acquisition crashes seen so far
    #[serde(deserialize_with = "lenient_count")]
    pub crash_count: i64,
    /// True on samples belonging to an unrepaired crash artifact
    #[serde(default, deserialize_with = "lenient_bool")]
    pub did_crash: bool,
}

impl TrackingSample {
    pub fn new(flip_time: f64, stim_pos: f64, user_pos: f64, crash_count: i64) -> Self {
        Self {
            flip_time,
            stim_pos,
            user_pos,
            crash_count,
            did_crash: false,
        }
    }
}

/// Tracking recording: stimulus and user position on a shared time axis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub samples: Vec<TrackingSample>,
}

impl TimeSeries {
    pub fn new(samples: Vec<TrackingSample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Borrow a contiguous index range of samples
    pub fn window(&self, range: Range<usize>) -> &[TrackingSample] {
        &self.samples[range]
    }

    pub fn flip_times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.flip_time).collect()
    }

    pub fn stim_positions(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.stim_pos).collect()
    }

    pub fn user_positions(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.user_pos).collect()
    }

    pub fn max_crash_count(&self) -> i64 {
        self.samples.iter().map(|s| s.crash_count).max().unwrap_or(0)
    }

    /// Negate `user_pos` on every sample
    pub fn invert_user(&mut self) {
        for sample in &mut self.samples {
            sample.user_pos = -sample.user_pos;
        }
    }
}

impl From<Vec<TrackingSample>> for TimeSeries {
    fn from(samples: Vec<TrackingSample>) -> Self {
        Self::new(samples)
    }
}

/// Pre/post windows around one crash transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashSegment {
    /// First sample after the crash
    pub crash_index: usize,
    pub pre_window: Range<usize>,
    pub post_window: Range<usize>,
    /// Seconds between the last pre-crash and first post-crash sample
    pub gap_duration: f64,
    pub missing_frame_count: i64,
    /// Either window was truncated by the series boundary
    pub is_partial: bool,
}

impl CrashSegment {
    /// Index range covered by both windows
    pub fn span(&self) -> Range<usize> {
        self.pre_window.start..self.post_window.end
    }

    pub fn len(&self) -> usize {
        self.post_window.end - self.pre_window.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &Range<usize>) -> bool {
        let span = self.span();
        span.start < other.end && other.start < span.end
    }
}

/// Which abscissa the transition curve was fitted against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisKind {
    /// The recorded timestamps
    Direct,
    /// Timestamps rebuilt from the median frame delta
    Reconstructed,
}

/// Synthesized samples bridging a crash
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionCurve {
    pub flip_time: Vec<f64>,
    pub stim_pos: Vec<f64>,
    pub user_pos: Vec<f64>,
    pub axis: AxisKind,
}

impl TransitionCurve {
    pub fn len(&self) -> usize {
        self.flip_time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flip_time.is_empty()
    }
}

/// What happened to one crash segment during repair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SegmentStatus {
    Repaired { axis: AxisKind },
    /// A window held fewer than two samples
    InsufficientData,
    FitFailed { reason: String },
    LengthMismatch { expected: usize, actual: usize },
    /// Window range intersects a segment that was already spliced
    Overlapping,
}

impl SegmentStatus {
    pub fn is_repaired(&self) -> bool {
        matches!(self, SegmentStatus::Repaired { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentReport {
    pub segment: CrashSegment,
    pub status: SegmentStatus,
}
