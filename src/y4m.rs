//! YUV4MPEG2 stream writing.
//!
//! A stream is one header line followed by one record per frame: the
//! `FRAME\n` marker, then the Y, U and V planes, each tightly packed (row
//! padding from the source is dropped). The format carries no lengths or
//! checksums, so a plane that reaches the destination short desynchronizes
//! every later frame; [`write_plane`] treats that as fatal.
//!
//! # Example
//!
//! ```no_run
//! use std::io::stdout;
//! use std::sync::Arc;
//!
//! use avs2yuv::{FfmpegEngine, FrameRange, FrameSource, source, y4m};
//!
//! let mut engine = FfmpegEngine::new()?;
//! let mut clip = source::open_normalized(&mut engine, "input.avs")?;
//! let range = FrameRange::resolve(0, None, clip.metadata().frame_count);
//!
//! let mut out = stdout().lock();
//! y4m::write_header(clip.metadata(), &mut out)?;
//! y4m::serialize(&mut clip, range, Some(&mut out), None)?;
//! # Ok::<(), avs2yuv::Avs2YuvError>(())
//! ```

use std::io::{ErrorKind, Write};
use std::sync::Arc;

use crate::{
    error::Avs2YuvError,
    metadata::ClipMetadata,
    plane::{Plane, PlaneView},
    progress::{NoOpProgress, ProgressCallback, ProgressTracker},
    range::FrameRange,
    source::{FrameSource, SourceFrame},
};

/// Marker preceding every frame record.
pub const FRAME_MARKER: &[u8; 6] = b"FRAME\n";

/// Outcome of a serialization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionSummary {
    /// The range that was processed.
    pub range: FrameRange,
    /// Frames fetched and released.
    pub frames_processed: u64,
    /// Bytes handed to the destination, header included when written.
    pub bytes_written: u64,
}

/// The stream header line for `metadata`, newline included.
///
/// Interlacing is always `Ip` and the pixel aspect ratio `0:0` (unknown).
pub fn header_line(metadata: &ClipMetadata) -> String {
    format!(
        "YUV4MPEG2 W{} H{} F{}:{} Ip A0:0\n",
        metadata.width,
        metadata.height,
        metadata.frame_rate.numerator,
        metadata.frame_rate.denominator,
    )
}

/// Write the stream header and flush it.
///
/// Returns the number of header bytes written.
pub fn write_header<W: Write + ?Sized>(
    metadata: &ClipMetadata,
    sink: &mut W,
) -> Result<usize, Avs2YuvError> {
    let header = header_line(metadata);
    sink.write_all(header.as_bytes())?;
    // Pipe readers need the header before the first frame arrives.
    sink.flush()?;
    Ok(header.len())
}

/// Write as much of `row` as the sink accepts.
///
/// Stops at the first error other than an interruption, or when the sink
/// accepts zero bytes. Returns the count accepted and the error, if any.
fn write_row<W: Write + ?Sized>(sink: &mut W, mut row: &[u8]) -> (usize, Option<std::io::Error>) {
    let mut written = 0;
    while !row.is_empty() {
        match sink.write(row) {
            Ok(0) => return (written, None),
            Ok(count) => {
                written += count;
                row = &row[count..];
            }
            Err(error) if error.kind() == ErrorKind::Interrupted => {}
            Err(error) => return (written, Some(error)),
        }
    }
    (written, None)
}

/// Write `height` rows of `width` bytes from `view`, skipping row padding.
///
/// Returns the bytes written, which always equals `width * height`; any
/// other count fails with [`Avs2YuvError::ShortWrite`].
pub fn write_plane<W: Write + ?Sized>(
    sink: &mut W,
    view: PlaneView<'_>,
    width: usize,
    height: usize,
    plane: Plane,
) -> Result<usize, Avs2YuvError> {
    let expected = width * height;
    let mut written = 0;

    for row_index in 0..height {
        let row = view.row(row_index, width);
        let (accepted, error) = write_row(sink, row);
        written += accepted;

        if let Some(error) = error {
            log::error!("Writing {plane} plane row {row_index} failed: {error}");
            break;
        }
        if accepted < width {
            break;
        }
    }

    if written != expected {
        return Err(Avs2YuvError::ShortWrite {
            plane,
            written,
            expected,
        });
    }
    Ok(written)
}

/// Write one frame record: marker, then the Y, U and V planes.
fn write_frame<F: SourceFrame + ?Sized, W: Write + ?Sized>(
    frame: &F,
    frame_number: u64,
    sink: &mut W,
    width: u32,
    height: u32,
) -> Result<usize, Avs2YuvError> {
    sink.write_all(FRAME_MARKER)?;
    let mut written = FRAME_MARKER.len();

    for plane in Plane::ALL {
        let view = frame.plane(plane).ok_or(Avs2YuvError::MissingPlane {
            frame_number,
            plane,
        })?;
        let (plane_width, plane_height) = plane.dimensions(width, height);
        written += write_plane(sink, view, plane_width, plane_height, plane)?;
    }

    Ok(written)
}

/// Serialize every frame of `range`, in ascending order.
///
/// With `sink` set to `None` frames are still fetched and reported to
/// `progress`, but nothing is written. Each frame handle is released before
/// progress is reported and before any error is returned. The first failure
/// ends the run; frames already written stay in the destination.
pub fn serialize<S: FrameSource>(
    clip: &mut S,
    range: FrameRange,
    mut sink: Option<&mut dyn Write>,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> Result<ConversionSummary, Avs2YuvError> {
    let width = clip.metadata().width;
    let height = clip.metadata().height;
    let mut tracker = ProgressTracker::new(
        progress.unwrap_or_else(|| Arc::new(NoOpProgress)),
        range.len(),
    );

    log::debug!(
        "Serializing frames {}..{} ({} frames, output={})",
        range.start,
        range.end,
        range.len(),
        sink.is_some(),
    );

    let mut summary = ConversionSummary {
        range,
        frames_processed: 0,
        bytes_written: 0,
    };

    for frame_number in range.indices() {
        let frame = clip.fetch(frame_number)?;

        let written = match sink.as_deref_mut() {
            Some(sink) => write_frame(&frame, frame_number, sink, width, height),
            None => Ok(0),
        };
        drop(frame);

        summary.bytes_written += written? as u64;
        summary.frames_processed += 1;
        tracker.advance(frame_number);
    }

    if let Some(sink) = sink {
        sink.flush()?;
    }

    Ok(summary)
}
