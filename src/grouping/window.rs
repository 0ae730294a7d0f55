use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::{EchonoteError, Result};
use crate::transcript::Segment;

/// Validated grouping width in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowWidth(i64);

impl WindowWidth {
    pub const MIN_MINUTES: i64 = 1;
    pub const MAX_MINUTES: i64 = 30;

    pub fn from_minutes(minutes: i64) -> Result<Self> {
        if (Self::MIN_MINUTES..=Self::MAX_MINUTES).contains(&minutes) {
            Ok(Self(minutes))
        } else {
            Err(EchonoteError::InvalidWindowWidth { minutes })
        }
    }

    pub fn minutes(&self) -> i64 {
        self.0
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.0)
    }
}

/// A non-empty run of segments falling inside one time window.
///
/// The window covers `[window_start, window_end)`; `window_end` is
/// always `window_start` plus the full width, even when the session
/// ended mid-window.
#[derive(Debug, Clone, Serialize)]
pub struct Window {
    /// Bucket ordinal from the first segment's start time. Not
    /// contiguous when intermediate windows hold no segments.
    pub index: usize,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub segments: Vec<Segment>,
}

/// Partitions segments into fixed-width windows anchored at the first
/// segment's start time.
///
/// A segment belongs to the window holding its start time; boundaries
/// are half-open, so a segment starting exactly at a boundary opens
/// the next window. Windows without segments are omitted. Segments
/// must arrive in non-decreasing start order, which the store
/// guarantees.
pub fn partition(segments: &[Segment], width: WindowWidth) -> Vec<Window> {
    let Some(first) = segments.first() else {
        return Vec::new();
    };
    let origin = first.start_time;
    let width_ms = width.duration().num_milliseconds();

    let mut windows: Vec<Window> = Vec::new();
    for segment in segments {
        let offset_ms = (segment.start_time - origin).num_milliseconds();
        let bucket = (offset_ms / width_ms) as usize;

        match windows.last_mut() {
            Some(window) if window.index == bucket => window.segments.push(segment.clone()),
            _ => {
                let window_start = origin + Duration::milliseconds(bucket as i64 * width_ms);
                windows.push(Window {
                    index: bucket,
                    window_start,
                    window_end: window_start + width.duration(),
                    segments: vec![segment.clone()],
                });
            }
        }
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn segment_at(id: u64, offset_secs: i64) -> Segment {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let start = base + Duration::seconds(offset_secs);
        Segment {
            id,
            start_time: start,
            end_time: start + Duration::seconds(10),
            text: format!("segment {}", id),
            confidence: None,
        }
    }

    #[test]
    fn test_width_validation_bounds() {
        assert!(WindowWidth::from_minutes(0).is_err());
        assert!(WindowWidth::from_minutes(31).is_err());
        assert_eq!(WindowWidth::from_minutes(1).unwrap().minutes(), 1);
        assert_eq!(WindowWidth::from_minutes(30).unwrap().minutes(), 30);
    }

    #[test]
    fn test_partition_empty_input() {
        let width = WindowWidth::from_minutes(5).unwrap();
        assert!(partition(&[], width).is_empty());
    }

    #[test]
    fn test_partition_single_segment() {
        let width = WindowWidth::from_minutes(5).unwrap();
        let segments = vec![segment_at(0, 0)];
        let windows = partition(&segments, width);

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].index, 0);
        assert_eq!(windows[0].window_start, segments[0].start_time);
        assert_eq!(
            windows[0].window_end,
            segments[0].start_time + Duration::minutes(5)
        );
    }

    #[test]
    fn test_partition_splits_by_start_time() {
        let width = WindowWidth::from_minutes(5).unwrap();
        // 0s and 299s share the first window, 301s opens the second
        let segments = vec![segment_at(0, 0), segment_at(1, 299), segment_at(2, 301)];
        let windows = partition(&segments, width);

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].segments.len(), 2);
        assert_eq!(windows[1].segments.len(), 1);
        assert_eq!(windows[1].segments[0].id, 2);
    }

    #[test]
    fn test_partition_boundary_opens_next_window() {
        let width = WindowWidth::from_minutes(5).unwrap();
        // Exactly 300s after the origin: belongs to window 1
        let segments = vec![segment_at(0, 0), segment_at(1, 300)];
        let windows = partition(&segments, width);

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].index, 1);
        assert_eq!(windows[1].window_start, segments[1].start_time);
    }

    #[test]
    fn test_partition_omits_empty_windows() {
        let width = WindowWidth::from_minutes(5).unwrap();
        // Nothing lands in windows 1 (5-10min); index jumps 0 -> 2
        let segments = vec![segment_at(0, 0), segment_at(1, 720)];
        let windows = partition(&segments, width);

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].index, 0);
        assert_eq!(windows[1].index, 2);
    }

    #[test]
    fn test_partition_every_segment_lands_exactly_once() {
        let width = WindowWidth::from_minutes(2).unwrap();
        let segments: Vec<Segment> = (0..40).map(|i| segment_at(i, i as i64 * 30)).collect();
        let windows = partition(&segments, width);

        let mut seen: Vec<u64> = windows
            .iter()
            .flat_map(|w| w.segments.iter().map(|s| s.id))
            .collect();
        seen.sort_unstable();
        let expected: Vec<u64> = (0..40).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_partition_is_deterministic() {
        let width = WindowWidth::from_minutes(3).unwrap();
        let segments: Vec<Segment> = (0..20).map(|i| segment_at(i, i as i64 * 45)).collect();

        let first = partition(&segments, width);
        let second = partition(&segments, width);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.index, b.index);
            assert_eq!(a.window_start, b.window_start);
            let a_ids: Vec<u64> = a.segments.iter().map(|s| s.id).collect();
            let b_ids: Vec<u64> = b.segments.iter().map(|s| s.id).collect();
            assert_eq!(a_ids, b_ids);
        }
    }

    #[test]
    fn test_partition_anchors_at_first_segment_not_midnight() {
        let width = WindowWidth::from_minutes(5).unwrap();
        // First segment at 10:03:30; a segment 4 minutes later is
        // still in window 0 even though it crosses 10:05
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 10, 3, 30).unwrap();
        let make = |id: u64, offset: i64| Segment {
            id,
            start_time: base + Duration::seconds(offset),
            end_time: base + Duration::seconds(offset + 5),
            text: String::new(),
            confidence: None,
        };
        let windows = partition(&[make(0, 0), make(1, 240)], width);
        assert_eq!(windows.len(), 1);
    }
}
