//! FFmpeg-backed script engine.
//!
//! [`FfmpegEngine`] evaluates scripts through libavformat: AviSynth (`.avs`)
//! and VapourSynth (`.vpy`) scripts are opened by FFmpeg's frame-server
//! demuxers when the linked FFmpeg was built with them, and any other video
//! file works as a plain clip. Conversion to planar 4:2:0 goes through
//! libswscale.
//!
//! FFmpeg has its own console logging, separate from the Rust
//! [`log`](https://crates.io/crates/log) facade used by this crate. The engine
//! optionally applies an [`FfmpegLogLevel`] for its lifetime and restores the
//! previous level when dropped.
//!
//! # Example
//!
//! ```no_run
//! use avs2yuv::{FfmpegEngine, FfmpegLogLevel, FrameSource, ScriptEngine};
//!
//! let mut engine = FfmpegEngine::with_log_level(FfmpegLogLevel::Error)?;
//! let clip = engine.import("input.avs".as_ref())?;
//! println!("{}", clip.metadata());
//! # Ok::<(), avs2yuv::Avs2YuvError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::{FieldOrder, context::Context as CodecContext},
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::log::Level,
};
use ffmpeg_sys_next::AV_NOPTS_VALUE;

use crate::{
    conversion,
    error::Avs2YuvError,
    metadata::{ClipMetadata, FrameRate, PixelFormat, ScanType},
    plane::{Plane, PlaneView},
    source::{FrameSource, ScriptEngine, SourceFrame},
};

/// FFmpeg internal log verbosity level.
///
/// Maps directly to FFmpeg's `AV_LOG_*` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print no output at all.
    Quiet,
    /// Only conditions the process cannot recover from.
    Panic,
    /// Unrecoverable errors.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Verbose informational messages.
    Verbose,
    /// Debugging messages.
    Debug,
    /// Extremely verbose tracing output.
    Trace,
}

impl FfmpegLogLevel {
    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }
}

/// A scoped FFmpeg environment.
///
/// Creating it initialises FFmpeg; dropping it restores the FFmpeg log level
/// that was active before, if this engine changed it.
pub struct FfmpegEngine {
    previous_level: Option<Level>,
}

impl Debug for FfmpegEngine {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FfmpegEngine")
            .field("restores_log_level", &self.previous_level.is_some())
            .finish()
    }
}

impl FfmpegEngine {
    /// Initialise FFmpeg, leaving its log level untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Avs2YuvError::FfmpegError`] if FFmpeg fails to initialise.
    pub fn new() -> Result<Self, Avs2YuvError> {
        ffmpeg_next::init().map_err(|error| {
            Avs2YuvError::FfmpegError(format!("FFmpeg initialisation failed: {error}"))
        })?;
        Ok(Self {
            previous_level: None,
        })
    }

    /// Initialise FFmpeg and apply `level` until the engine is dropped.
    pub fn with_log_level(level: FfmpegLogLevel) -> Result<Self, Avs2YuvError> {
        let mut engine = Self::new()?;
        engine.previous_level = ffmpeg_next::util::log::get_level().ok();
        ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
        Ok(engine)
    }
}

impl Drop for FfmpegEngine {
    fn drop(&mut self) {
        if let Some(level) = self.previous_level.take() {
            ffmpeg_next::util::log::set_level(level);
        }
    }
}

impl ScriptEngine for FfmpegEngine {
    type Clip = FfmpegClip;

    fn import(&mut self, path: &Path) -> Result<FfmpegClip, Avs2YuvError> {
        FfmpegClip::open(path)
    }

    fn convert_to_yuv420(&mut self, mut clip: FfmpegClip) -> Result<FfmpegClip, Avs2YuvError> {
        if matches!(clip.delivery, Delivery::Converted { .. }) {
            return Ok(clip);
        }

        let width = clip.metadata.width;
        let height = clip.metadata.height;
        let scaler = ScalingContext::get(
            clip.decoder.format(),
            width,
            height,
            Pixel::YUV420P,
            width,
            height,
            ScalingFlags::BILINEAR,
        );

        match scaler {
            Ok(scaler) => {
                clip.delivery = Delivery::Converted {
                    scaler,
                    scaled: VideoFrame::empty(),
                };
                clip.metadata.pixel_format = PixelFormat::Yuv420p;
            }
            Err(error) => {
                log::warn!(
                    "No conversion from {:?} to YUV420P for {}: {error}",
                    clip.decoder.format(),
                    clip.path.display(),
                );
            }
        }
        Ok(clip)
    }
}

/// How decoded frames reach the serializer, chosen once at open time.
enum Delivery {
    /// Decoded frames are already planar 4:2:0.
    Native,
    /// Decoded frames go through libswscale first.
    Converted {
        scaler: ScalingContext,
        scaled: VideoFrame,
    },
}

/// A clip decoded by FFmpeg.
///
/// Frames are decoded sequentially; fetching anything other than the next
/// frame seeks to the preceding keyframe and decodes forward.
pub struct FfmpegClip {
    input: Input,
    decoder: VideoDecoder,
    stream_index: usize,
    time_base: (i32, i32),
    start_time: i64,
    path: PathBuf,
    metadata: ClipMetadata,
    delivery: Delivery,
    decoded: VideoFrame,
    /// Number of the frame the decoder is expected to produce next.
    next_frame: u64,
    eof_sent: bool,
}

impl Debug for FfmpegClip {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FfmpegClip")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .field("stream_index", &self.stream_index)
            .field(
                "converted",
                &matches!(self.delivery, Delivery::Converted { .. }),
            )
            .field("next_frame", &self.next_frame)
            .finish_non_exhaustive()
    }
}

impl FfmpegClip {
    fn open(path: &Path) -> Result<Self, Avs2YuvError> {
        let script_error = |reason: String| Avs2YuvError::ScriptOpen {
            path: path.to_path_buf(),
            reason,
        };

        let input =
            ffmpeg_next::format::input(&path).map_err(|error| script_error(error.to_string()))?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or_else(|| script_error("didn't return a video clip".to_string()))?;
        let stream_index = stream.index();
        let time_base = stream.time_base();
        let time_base = (time_base.numerator(), time_base.denominator());
        let start_time = match stream.start_time() {
            AV_NOPTS_VALUE => 0,
            start => start,
        };

        let decoder_context = CodecContext::from_parameters(stream.parameters())
            .map_err(|error| script_error(format!("Failed to read codec parameters: {error}")))?;
        let decoder = decoder_context
            .decoder()
            .video()
            .map_err(|error| script_error(format!("Failed to create video decoder: {error}")))?;

        let frame_rate = [stream.avg_frame_rate(), stream.rate()]
            .into_iter()
            .filter_map(|rate| {
                let rate = FrameRate::new(
                    u32::try_from(rate.numerator()).ok()?,
                    u32::try_from(rate.denominator()).ok()?,
                );
                rate.is_valid().then_some(rate)
            })
            .next()
            .ok_or_else(|| script_error("could not determine the frame rate".to_string()))?;

        // Container duration covers every stream; only trust it last.
        let frame_count = match (u64::try_from(stream.frames()), stream.duration()) {
            (Ok(frames), _) if frames > 0 => frames,
            (_, duration) if duration > 0 && duration != AV_NOPTS_VALUE => {
                conversion::stream_duration_to_frame_count(duration, time_base, frame_rate)
            }
            _ => conversion::duration_to_frame_count(input.duration(), frame_rate),
        };

        let scan_type = match decoder.field_order() {
            FieldOrder::TT | FieldOrder::BB | FieldOrder::TB | FieldOrder::BT => {
                ScanType::FieldBased
            }
            _ => ScanType::Progressive,
        };

        let metadata = ClipMetadata {
            width: decoder.width(),
            height: decoder.height(),
            frame_rate,
            frame_count,
            pixel_format: pixel_format_from_ffmpeg(decoder.format()),
            scan_type,
        };

        log::debug!(
            "Opened {} (format={}, stream={stream_index}, pixel={:?}, time_base={}/{})",
            path.display(),
            input.format().name(),
            decoder.format(),
            time_base.0,
            time_base.1,
        );

        Ok(Self {
            input,
            decoder,
            stream_index,
            time_base,
            start_time,
            path: path.to_path_buf(),
            metadata,
            delivery: Delivery::Native,
            decoded: VideoFrame::empty(),
            next_frame: 0,
            eof_sent: false,
        })
    }

    /// Reposition the demuxer so the next decoded frame is at or before
    /// `frame_number`.
    fn seek_to(&mut self, frame_number: u64) -> Result<(), FfmpegError> {
        let timestamp =
            conversion::frame_number_to_seek_timestamp(frame_number, self.metadata.frame_rate)
                .saturating_add(conversion::stream_ts_to_av_time_base(
                    self.start_time,
                    self.time_base,
                ));
        log::debug!(
            "Seeking {} to frame {frame_number} (ts={timestamp})",
            self.path.display()
        );

        self.input.seek(timestamp, ..timestamp)?;
        self.decoder.flush();
        self.eof_sent = false;
        self.next_frame = frame_number;
        Ok(())
    }

    /// Decode the next frame into `self.decoded` and return its number, or
    /// `None` once the stream is drained.
    fn decode_next(&mut self) -> Result<Option<u64>, FfmpegError> {
        loop {
            if self.decoder.receive_frame(&mut self.decoded).is_ok() {
                let frame_number = match self.decoded.pts() {
                    Some(pts) => conversion::pts_to_frame_number(
                        pts.saturating_sub(self.start_time),
                        self.time_base,
                        self.metadata.frame_rate,
                    ),
                    None => self.next_frame,
                };
                self.next_frame = frame_number + 1;
                return Ok(Some(frame_number));
            }

            if self.eof_sent {
                return Ok(None);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() == self.stream_index {
                        self.decoder.send_packet(&packet)?;
                    }
                }
                Err(FfmpegError::Eof) => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Leave frame `frame_number` in `self.decoded`.
    ///
    /// When decoding lands past the frame, the seek is retried from ever
    /// earlier origins down to the start of the stream. A frame that still
    /// cannot be reached is a fetch error; no neighbour is substituted.
    fn position_at(&mut self, frame_number: u64) -> Result<(), Avs2YuvError> {
        let fetch_error = |reason: String| Avs2YuvError::FrameFetch {
            frame_number,
            reason,
        };

        if frame_number >= self.metadata.frame_count {
            return Err(fetch_error(format!(
                "frame is out of range (clip has {} frames)",
                self.metadata.frame_count
            )));
        }

        let mut attempt = 0;
        let mut needs_seek = frame_number != self.next_frame;
        loop {
            let origin =
                conversion::seek_retry_origin(frame_number, attempt, self.metadata.frame_rate);
            if needs_seek {
                self.seek_to(origin)
                    .map_err(|error| fetch_error(format!("seek failed: {error}")))?;
            }

            let decoded = loop {
                match self
                    .decode_next()
                    .map_err(|error| fetch_error(error.to_string()))?
                {
                    None => {
                        return Err(fetch_error(
                            "stream ended before the frame was decoded".to_string(),
                        ));
                    }
                    Some(decoded) if decoded < frame_number => continue,
                    Some(decoded) => break decoded,
                }
            };

            if decoded == frame_number {
                return Ok(());
            }
            if needs_seek && origin == 0 {
                return Err(fetch_error(format!(
                    "frame not present in the stream (decoding resumed at frame {decoded})"
                )));
            }

            log::debug!(
                "Landed on frame {decoded} looking for {frame_number} in {}, seeking earlier",
                self.path.display()
            );
            if needs_seek {
                attempt += 1;
            }
            needs_seek = true;
        }
    }
}

impl FrameSource for FfmpegClip {
    type Frame<'a> = FfmpegFrame<'a>;

    fn metadata(&self) -> &ClipMetadata {
        &self.metadata
    }

    fn fetch(&mut self, frame_number: u64) -> Result<FfmpegFrame<'_>, Avs2YuvError> {
        self.position_at(frame_number)?;

        let frame = match &mut self.delivery {
            Delivery::Native => &self.decoded,
            Delivery::Converted { scaler, scaled } => {
                scaler
                    .run(&self.decoded, scaled)
                    .map_err(|error| Avs2YuvError::FrameFetch {
                        frame_number,
                        reason: format!("conversion to YV12 failed: {error}"),
                    })?;
                &*scaled
            }
        };

        Ok(FfmpegFrame { frame })
    }
}

/// A decoded (and possibly converted) frame borrowed from its clip.
pub struct FfmpegFrame<'a> {
    frame: &'a VideoFrame,
}

impl SourceFrame for FfmpegFrame<'_> {
    fn plane(&self, plane: Plane) -> Option<PlaneView<'_>> {
        let index = plane.index();
        if index >= self.frame.planes() {
            return None;
        }
        Some(PlaneView::new(self.frame.data(index), self.frame.stride(index)))
    }
}

/// Map an FFmpeg pixel format onto the crate's closed set.
fn pixel_format_from_ffmpeg(pixel: Pixel) -> PixelFormat {
    match pixel {
        Pixel::YUV420P | Pixel::YUVJ420P => PixelFormat::Yuv420p,
        Pixel::YUYV422 => PixelFormat::Yuyv422,
        Pixel::YUV422P | Pixel::YUVJ422P => PixelFormat::Yuv422p,
        Pixel::YUV444P | Pixel::YUVJ444P => PixelFormat::Yuv444p,
        Pixel::RGB24 | Pixel::BGR24 => PixelFormat::Rgb24,
        Pixel::RGBA | Pixel::BGRA | Pixel::ARGB | Pixel::ABGR => PixelFormat::Rgb32,
        Pixel::GRAY8 => PixelFormat::Gray8,
        other => PixelFormat::Other(format!("{other:?}")),
    }
}
