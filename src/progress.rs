//! Progress reporting.
//!
//! [`ProgressCallback`] receives a [`ProgressInfo`] after each frame leaves the
//! serializer. Reports are a side channel: they are never written to the
//! YUV4MPEG2 output and they cannot stop a run.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use avs2yuv::{ConvertOptions, ProgressCallback, ProgressInfo};
//!
//! struct PrintFrameNumber;
//!
//! impl ProgressCallback for PrintFrameNumber {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         eprintln!("{}", info.frame_number);
//!     }
//! }
//!
//! let options = ConvertOptions::new().with_progress(Arc::new(PrintFrameNumber));
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// A snapshot of serialization progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Source index of the frame that was just processed.
    pub frame_number: u64,
    /// How many frames of the range have been processed so far.
    pub current: u64,
    /// Frames in the resolved range.
    pub total: u64,
    /// Completion percentage (0.0 – 100.0). `None` for an empty range.
    pub percentage: Option<f32>,
    /// Wall-clock time since the first frame was requested.
    pub elapsed: Duration,
    /// Estimated time remaining, based on throughput so far.
    pub estimated_remaining: Option<Duration>,
}

/// Trait for receiving per-frame progress.
///
/// Implementations must be [`Send`] and [`Sync`] so options carrying them can
/// be shared across threads.
pub trait ProgressCallback: Send + Sync {
    /// Called once a frame has been written (or skipped, without output) and
    /// its handle released.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. Used when nothing is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks timing across a run and forwards snapshots to the callback.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: u64,
    current: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: u64) -> Self {
        Self {
            callback,
            total,
            current: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one finished frame and report it.
    pub(crate) fn advance(&mut self, frame_number: u64) {
        self.current += 1;

        let elapsed = self.start_time.elapsed();
        let percentage = (self.total > 0)
            .then(|| (self.current as f32 / self.total as f32) * 100.0);
        let estimated_remaining = (self.current > 0).then(|| {
            let remaining = self.total.saturating_sub(self.current);
            elapsed.div_f64(self.current as f64).mul_f64(remaining as f64)
        });

        let info = ProgressInfo {
            frame_number,
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
        };

        self.callback.on_progress(&info);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recording {
        infos: Mutex<Vec<ProgressInfo>>,
    }

    impl ProgressCallback for Recording {
        fn on_progress(&self, info: &ProgressInfo) {
            self.infos.lock().unwrap().push(info.clone());
        }
    }

    #[test]
    fn every_frame_is_reported() {
        let recording = Arc::new(Recording::default());
        let mut tracker = ProgressTracker::new(recording.clone(), 4);

        for frame_number in 10..14 {
            tracker.advance(frame_number);
        }

        let infos = recording.infos.lock().unwrap();
        assert_eq!(infos.len(), 4);
        assert_eq!(
            infos.iter().map(|info| info.frame_number).collect::<Vec<_>>(),
            vec![10, 11, 12, 13]
        );
        assert_eq!(infos[1].current, 2);
        assert_eq!(infos[1].percentage, Some(50.0));
        assert_eq!(infos[3].percentage, Some(100.0));
        assert_eq!(infos[3].estimated_remaining, Some(Duration::ZERO));
    }
}
