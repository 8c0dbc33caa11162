//! In-memory script engine.
//!
//! [`MemoryEngine`] serves [`MemoryClip`]s registered under script paths. Clips
//! hold their planes in memory with arbitrary row strides, can carry a
//! pre-built converted form, can fail at a chosen frame, and count every fetch
//! and release through [`FrameStats`]. Useful for embedding the serializer
//! behind a custom frame producer and for exercising it deterministically.
//!
//! # Example
//!
//! ```
//! use avs2yuv::{
//!     ClipMetadata, ConvertOptions, FrameRate, MemoryClip, MemoryEngine, PixelFormat,
//!     ScanType, pipeline,
//! };
//!
//! let metadata = ClipMetadata {
//!     width: 4,
//!     height: 4,
//!     frame_rate: FrameRate::new(30, 1),
//!     frame_count: 2,
//!     pixel_format: PixelFormat::Yuv420p,
//!     scan_type: ScanType::Progressive,
//! };
//! let mut engine = MemoryEngine::new().with_clip("clip.avs", MemoryClip::patterned(metadata, 0));
//!
//! let mut out = Vec::new();
//! pipeline::convert(&mut engine, "clip.avs", Some(&mut out), &ConvertOptions::new())?;
//! assert!(out.starts_with(b"YUV4MPEG2 W4 H4 F30:1 Ip A0:0\n"));
//! # Ok::<(), avs2yuv::Avs2YuvError>(())
//! ```

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    error::Avs2YuvError,
    metadata::ClipMetadata,
    plane::{Plane, PlaneView},
    source::{FrameSource, ScriptEngine, SourceFrame},
};

/// Byte used for row padding in [`MemoryClip::patterned`] clips.
pub const PADDING_BYTE: u8 = 0xEE;

#[derive(Debug, Default)]
struct Counters {
    fetched: AtomicU64,
    released: AtomicU64,
    order: Mutex<Vec<u64>>,
}

/// Shared fetch/release counters of a clip and its converted form.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    counters: Arc<Counters>,
}

impl FrameStats {
    /// Successful fetches so far.
    pub fn fetched(&self) -> u64 {
        self.counters.fetched.load(Ordering::Acquire)
    }

    /// Frame handles released so far.
    pub fn released(&self) -> u64 {
        self.counters.released.load(Ordering::Acquire)
    }

    /// Frame handles currently alive.
    pub fn outstanding(&self) -> u64 {
        self.fetched().saturating_sub(self.released())
    }

    /// Indices of successful fetches, in call order.
    pub fn fetch_order(&self) -> Vec<u64> {
        self.counters
            .order
            .lock()
            .map(|order| order.clone())
            .unwrap_or_default()
    }

    fn record_fetch(&self, frame_number: u64) {
        self.counters.fetched.fetch_add(1, Ordering::AcqRel);
        if let Ok(mut order) = self.counters.order.lock() {
            order.push(frame_number);
        }
    }

    fn record_release(&self) {
        self.counters.released.fetch_add(1, Ordering::AcqRel);
    }
}

/// Planes of one stored frame.
#[derive(Debug, Clone)]
struct StoredFrame {
    planes: [Vec<u8>; 3],
    strides: [usize; 3],
}

/// A clip whose frames live in memory.
#[derive(Debug, Clone)]
pub struct MemoryClip {
    metadata: ClipMetadata,
    frames: Vec<StoredFrame>,
    fault: Option<(u64, String)>,
    converted: Option<Box<MemoryClip>>,
    stats: FrameStats,
}

impl MemoryClip {
    /// A clip with `metadata` and no frames yet.
    pub fn new(metadata: ClipMetadata) -> Self {
        Self {
            metadata,
            frames: Vec::new(),
            fault: None,
            converted: None,
            stats: FrameStats::default(),
        }
    }

    /// A clip of `metadata.frame_count` frames filled with
    /// [`pattern_byte`](MemoryClip::pattern_byte) values, each row followed by
    /// `padding` bytes of [`PADDING_BYTE`].
    pub fn patterned(metadata: ClipMetadata, padding: usize) -> Self {
        let (width, height) = (metadata.width, metadata.height);
        let mut clip = Self::new(metadata);
        for frame_number in 0..clip.metadata.frame_count {
            let build = |plane: Plane| {
                let (plane_width, plane_height) = plane.dimensions(width, height);
                let stride = plane_width + padding;
                let mut data = vec![PADDING_BYTE; stride * plane_height];
                for row in 0..plane_height {
                    for column in 0..plane_width {
                        data[row * stride + column] =
                            Self::pattern_byte(frame_number, plane, row, column);
                    }
                }
                (data, stride)
            };
            let (y, y_stride) = build(Plane::Y);
            let (u, u_stride) = build(Plane::U);
            let (v, v_stride) = build(Plane::V);
            clip = clip.with_frame([y, u, v], [y_stride, u_stride, v_stride]);
        }
        clip
    }

    /// Pixel value used by [`patterned`](MemoryClip::patterned) clips.
    pub fn pattern_byte(frame_number: u64, plane: Plane, row: usize, column: usize) -> u8 {
        let base: u8 = match plane {
            Plane::Y => 0x10,
            Plane::U => 0x80,
            Plane::V => 0xC0,
        };
        base.wrapping_add((frame_number as u8).wrapping_mul(3))
            .wrapping_add((row as u8).wrapping_mul(5))
            .wrapping_add(column as u8)
    }

    /// The tightly packed bytes `plane` of `frame_number` serializes to in a
    /// [`patterned`](MemoryClip::patterned) clip.
    pub fn packed_pattern(&self, frame_number: u64, plane: Plane) -> Vec<u8> {
        let (width, height) = plane.dimensions(self.metadata.width, self.metadata.height);
        let mut packed = Vec::with_capacity(width * height);
        for row in 0..height {
            for column in 0..width {
                packed.push(Self::pattern_byte(frame_number, plane, row, column));
            }
        }
        packed
    }

    /// Append a frame given its Y, U and V buffers and their row strides.
    #[must_use]
    pub fn with_frame(mut self, planes: [Vec<u8>; 3], strides: [usize; 3]) -> Self {
        self.frames.push(StoredFrame { planes, strides });
        self
    }

    /// Make fetching `frame_number` fail with an engine fault.
    #[must_use]
    pub fn with_fault(mut self, frame_number: u64, reason: impl Into<String>) -> Self {
        self.fault = Some((frame_number, reason.into()));
        self
    }

    /// The clip [`MemoryEngine::convert_to_yuv420`] should return for this one.
    ///
    /// The converted clip shares this clip's [`FrameStats`].
    #[must_use]
    pub fn with_conversion(mut self, mut converted: MemoryClip) -> Self {
        converted.stats = self.stats.clone();
        self.converted = Some(Box::new(converted));
        self
    }

    /// Fetch and release counters.
    pub fn stats(&self) -> FrameStats {
        self.stats.clone()
    }
}

impl FrameSource for MemoryClip {
    type Frame<'a> = MemoryFrame<'a>;

    fn metadata(&self) -> &ClipMetadata {
        &self.metadata
    }

    fn fetch(&mut self, frame_number: u64) -> Result<MemoryFrame<'_>, Avs2YuvError> {
        if let Some((fault_at, reason)) = &self.fault {
            if *fault_at == frame_number {
                return Err(Avs2YuvError::FrameFetch {
                    frame_number,
                    reason: reason.clone(),
                });
            }
        }

        let stored = usize::try_from(frame_number)
            .ok()
            .and_then(|index| self.frames.get(index))
            .ok_or_else(|| Avs2YuvError::FrameFetch {
                frame_number,
                reason: format!("frame is out of range (clip has {} frames)", self.frames.len()),
            })?;

        self.stats.record_fetch(frame_number);
        Ok(MemoryFrame {
            stored,
            stats: &self.stats,
        })
    }
}

/// A frame borrowed from a [`MemoryClip`]. Counts as released when dropped.
#[derive(Debug)]
pub struct MemoryFrame<'a> {
    stored: &'a StoredFrame,
    stats: &'a FrameStats,
}

impl SourceFrame for MemoryFrame<'_> {
    fn plane(&self, plane: Plane) -> Option<PlaneView<'_>> {
        let index = plane.index();
        Some(PlaneView::new(
            self.stored.planes.get(index)?,
            *self.stored.strides.get(index)?,
        ))
    }
}

impl Drop for MemoryFrame<'_> {
    fn drop(&mut self) {
        self.stats.record_release();
    }
}

/// Script engine serving registered [`MemoryClip`]s.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    clips: HashMap<PathBuf, MemoryClip>,
    conversions: usize,
}

impl MemoryEngine {
    /// An engine with no scripts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `clip` as the result of importing `path`.
    #[must_use]
    pub fn with_clip(mut self, path: impl Into<PathBuf>, clip: MemoryClip) -> Self {
        self.clips.insert(path.into(), clip);
        self
    }

    /// How many times conversion was requested.
    pub fn conversions(&self) -> usize {
        self.conversions
    }
}

impl ScriptEngine for MemoryEngine {
    type Clip = MemoryClip;

    fn import(&mut self, path: &Path) -> Result<MemoryClip, Avs2YuvError> {
        self.clips
            .get(path)
            .cloned()
            .ok_or_else(|| Avs2YuvError::ScriptOpen {
                path: path.to_path_buf(),
                reason: "no such script".to_string(),
            })
    }

    fn convert_to_yuv420(&mut self, mut clip: MemoryClip) -> Result<MemoryClip, Avs2YuvError> {
        self.conversions += 1;
        Ok(match clip.converted.take() {
            Some(converted) => *converted,
            None => clip,
        })
    }
}
