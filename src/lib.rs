//! # avs2yuv
//!
//! Render a frame-server script to a YUV4MPEG2 stream.
//!
//! A script engine evaluates the input into a clip; the clip is brought to
//! progressive planar 4:2:0 (converting at most once), and the selected frame
//! range is written as a YUV4MPEG2 stream: one header line, then a `FRAME\n`
//! marker and the tightly packed Y, U and V planes for every frame. Row
//! padding in the source buffers never reaches the stream.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::io::stdout;
//!
//! use avs2yuv::{ConvertOptions, FfmpegEngine, pipeline};
//!
//! let mut engine = FfmpegEngine::new()?;
//! let mut out = stdout().lock();
//! pipeline::convert(
//!     &mut engine,
//!     "input.avs",
//!     Some(&mut out),
//!     &ConvertOptions::new().with_seek(100).with_frames(50),
//! )?;
//! # Ok::<(), avs2yuv::Avs2YuvError>(())
//! ```
//!
//! ## Engines
//!
//! | Engine | Description |
//! |--------|-------------|
//! | [`FfmpegEngine`] | FFmpeg decoding, with AviSynth or VapourSynth scripts if built in. |
//! | [`MemoryEngine`] | Clips held in memory, for embedding and tests. |
//!
//! Any other frame producer can be plugged in by implementing
//! [`ScriptEngine`] and [`FrameSource`].
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod config;
mod conversion;
pub mod error;
pub mod ffmpeg;
pub mod memory;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod plane;
pub mod progress;
pub mod range;
pub mod source;
pub mod y4m;

pub use config::ConvertOptions;
pub use error::{Avs2YuvError, ErrorCategory};
pub use ffmpeg::{FfmpegClip, FfmpegEngine, FfmpegFrame, FfmpegLogLevel};
pub use memory::{FrameStats, MemoryClip, MemoryEngine, MemoryFrame};
pub use metadata::{ClipMetadata, FrameRate, PixelFormat, ScanType};
pub use output::{Output, OutputTarget};
pub use plane::{Plane, PlaneView};
pub use progress::{ProgressCallback, ProgressInfo};
pub use range::FrameRange;
pub use source::{FrameSource, ScriptEngine, SourceFrame};
pub use y4m::ConversionSummary;
