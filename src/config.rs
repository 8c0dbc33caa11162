//! Conversion options.
//!
//! [`ConvertOptions`] is a builder carrying the frame selection (seek position
//! and optional frame count) and the progress callback through a run.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use avs2yuv::{ConvertOptions, ProgressCallback, ProgressInfo};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{}/{} done", info.current, info.total);
//!     }
//! }
//!
//! let options = ConvertOptions::new()
//!     .with_seek(100)
//!     .with_frames(250)
//!     .with_progress(Arc::new(LogProgress));
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use crate::{progress::ProgressCallback, range::FrameRange};

/// Options for a conversion run.
///
/// A default-constructed value converts every frame without reporting
/// progress.
#[derive(Clone, Default)]
pub struct ConvertOptions {
    /// First source frame to serialize.
    pub(crate) seek: u64,
    /// Frames to serialize from `seek`. Non-positive or overlong counts mean
    /// "to the end of the clip".
    pub(crate) frames: Option<i64>,
    /// Per-frame progress callback.
    pub(crate) progress: Option<Arc<dyn ProgressCallback>>,
}

impl Debug for ConvertOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ConvertOptions")
            .field("seek", &self.seek)
            .field("frames", &self.frames)
            .field("has_progress", &self.progress.is_some())
            .finish()
    }
}

impl ConvertOptions {
    /// Create options that convert the whole clip.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at source frame `seek`.
    #[must_use]
    pub fn with_seek(mut self, seek: u64) -> Self {
        self.seek = seek;
        self
    }

    /// Stop after `frames` frames.
    #[must_use]
    pub fn with_frames(mut self, frames: i64) -> Self {
        self.frames = Some(frames);
        self
    }

    /// Attach a per-frame progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Returns `true` if a progress callback is attached.
    pub fn reports_progress(&self) -> bool {
        self.progress.is_some()
    }

    /// The frame range these options select from a clip of `total_frames`.
    pub fn range(&self, total_frames: u64) -> FrameRange {
        FrameRange::resolve(self.seek, self.frames, total_frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressInfo;

    struct Silent;

    impl ProgressCallback for Silent {
        fn on_progress(&self, _info: &ProgressInfo) {}
    }

    #[test]
    fn defaults_select_everything() {
        let options = ConvertOptions::new();
        assert_eq!(options.range(42), FrameRange { start: 0, end: 42 });
        assert!(!options.reports_progress());
    }

    #[test]
    fn builder_sets_range() {
        let options = ConvertOptions::new().with_seek(5).with_frames(10);
        assert_eq!(options.range(100), FrameRange { start: 5, end: 15 });
        assert_eq!(options.range(8), FrameRange { start: 5, end: 8 });
    }

    #[test]
    fn debug_hides_callback() {
        let options = ConvertOptions::new().with_progress(Arc::new(Silent));
        assert!(options.reports_progress());
        assert!(format!("{options:?}").contains("has_progress: true"));
    }
}
