use crate::types::{CrashSegment, TimeSeries};

/// Locate crash transitions and cut a bounded window on each side.
///
/// A transition is any index where `crash_count` differs from the previous
/// sample; that index is the first post-crash sample. Windows are truncated
/// at the series boundaries, and a transition with nothing on one side
/// yields no segment. Segments come back in ascending index order.
pub fn find_crash_segments(
    series: &TimeSeries,
    window_frame_count: usize,
    sampling_rate: f64,
) -> Vec<CrashSegment> {
    let samples = &series.samples;
    let n = samples.len();
    let mut segments = Vec::new();

    for crash_index in 1..n {
        if samples[crash_index].crash_count == samples[crash_index - 1].crash_count {
            continue;
        }

        let pre_len = window_frame_count.min(crash_index);
        let post_len = window_frame_count.min(n - crash_index);
        if pre_len == 0 || post_len == 0 {
            continue;
        }

        let pre_window = crash_index - pre_len..crash_index;
        let post_window = crash_index..crash_index + post_len;
        let gap_duration = samples[crash_index].flip_time - samples[crash_index - 1].flip_time;
        let missing_frame_count = (gap_duration * sampling_rate).round() as i64;

        log::debug!(
            "Crash at index {}: pre {:?}, post {:?}, gap {:.3}s ({} frames)",
            crash_index,
            pre_window,
            post_window,
            gap_duration,
            missing_frame_count
        );

        segments.push(CrashSegment {
            crash_index,
            pre_window,
            post_window,
            gap_duration,
            missing_frame_count,
            is_partial: pre_len < window_frame_count || post_len < window_frame_count,
        });
    }

    segments
}
