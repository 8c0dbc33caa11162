//! Frame range resolution.
//!
//! A run serializes the half-open interval `[start, end)` of source frames.
//! The interval comes from a seek position and an optional frame count that
//! may be zero, negative, or reach past the end of the clip; all of those
//! silently fall back to "every remaining frame".

use std::ops::Range;

use crate::error::Avs2YuvError;

/// The half-open interval of source frames a run serializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRange {
    /// First frame index (inclusive).
    pub start: u64,
    /// One past the last frame index.
    pub end: u64,
}

impl FrameRange {
    /// Resolve a seek position and an optional frame count against the clip's
    /// total frame count.
    ///
    /// `end` becomes `seek + frames`, or `total_frames` if no count was given.
    /// When that end is not past `seek`, or lies beyond the clip, it is
    /// replaced by `total_frames`. The result may be empty (e.g. an empty clip
    /// or a seek past the end), in which case no frames are serialized.
    pub fn resolve(seek: u64, frames: Option<i64>, total_frames: u64) -> Self {
        let start = seek;
        let requested_end = match frames {
            Some(count) => i128::from(start) + i128::from(count),
            None => i128::from(total_frames),
        };

        let end = if requested_end <= i128::from(start) || requested_end > i128::from(total_frames)
        {
            total_frames
        } else {
            // Bounded by total_frames above.
            requested_end as u64
        };

        Self { start, end }
    }

    /// Number of frames in the range.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if no frames fall in the range.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The frame indices in ascending order.
    pub fn indices(&self) -> Range<u64> {
        self.start..self.end.max(self.start)
    }
}

/// Validate a requested seek position.
///
/// Negative positions are a usage error, raised before any engine work.
pub fn validate_seek(seek: i64) -> Result<u64, Avs2YuvError> {
    u64::try_from(seek)
        .map_err(|_| Avs2YuvError::Usage(format!("-seek must not be negative (got {seek})")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_count_runs_to_end() {
        assert_eq!(FrameRange::resolve(0, None, 100), FrameRange { start: 0, end: 100 });
        assert_eq!(FrameRange::resolve(40, None, 100), FrameRange { start: 40, end: 100 });
    }

    #[test]
    fn count_is_relative_to_seek() {
        let range = FrameRange::resolve(10, Some(5), 100);
        assert_eq!(range, FrameRange { start: 10, end: 15 });
        assert_eq!(range.len(), 5);
        assert_eq!(range.indices().collect::<Vec<_>>(), vec![10, 11, 12, 13, 14]);
    }

    #[test]
    fn non_positive_count_clamps_to_end() {
        assert_eq!(FrameRange::resolve(10, Some(0), 100).end, 100);
        assert_eq!(FrameRange::resolve(10, Some(-3), 100).end, 100);
    }

    #[test]
    fn overlong_count_clamps_to_end() {
        assert_eq!(FrameRange::resolve(90, Some(11), 100), FrameRange { start: 90, end: 100 });
        assert_eq!(FrameRange::resolve(0, Some(i64::MAX), 100).end, 100);
    }

    #[test]
    fn exact_fit_is_kept() {
        assert_eq!(FrameRange::resolve(90, Some(10), 100).end, 100);
    }

    #[test]
    fn empty_clip_yields_empty_range() {
        let range = FrameRange::resolve(0, None, 0);
        assert!(range.is_empty());
        assert_eq!(range.indices().count(), 0);

        assert!(FrameRange::resolve(0, Some(5), 0).is_empty());
    }

    #[test]
    fn seek_past_end_is_empty() {
        let range = FrameRange::resolve(150, Some(5), 100);
        assert_eq!(range, FrameRange { start: 150, end: 100 });
        assert!(range.is_empty());
        assert_eq!(range.indices().count(), 0);
    }

    #[test]
    fn negative_seek_is_usage_error() {
        let error = validate_seek(-1).unwrap_err();
        assert!(matches!(error, Avs2YuvError::Usage(_)));
        assert_eq!(error.exit_code(), 2);
        assert_eq!(validate_seek(12).unwrap(), 12);
    }
}
