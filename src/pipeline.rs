//! End-to-end conversion.
//!
//! [`convert`] runs a whole job against an already opened destination.
//! Callers that must not create the destination before the clip is known to
//! be convertible (the command-line tool does this, so a failed run leaves no
//! empty file behind) use [`convert_clip`] after
//! [`source::open_normalized`](crate::source::open_normalized).

use std::{io::Write, path::Path};

use crate::{
    config::ConvertOptions,
    error::Avs2YuvError,
    source::{self, FrameSource, ScriptEngine},
    y4m::{self, ConversionSummary},
};

/// Open, normalize and validate the script, then convert it.
///
/// Format problems are detected before anything is written. With `output`
/// set to `None` every frame of the range is still fetched.
///
/// # Example
///
/// ```no_run
/// use std::fs::File;
/// use std::io::BufWriter;
///
/// use avs2yuv::{ConvertOptions, FfmpegEngine, pipeline};
///
/// let mut engine = FfmpegEngine::new()?;
/// let mut out = BufWriter::new(File::create("out.y4m")?);
/// let summary = pipeline::convert(
///     &mut engine,
///     "input.avs",
///     Some(&mut out),
///     &ConvertOptions::new().with_frames(100),
/// )?;
/// println!("{} frames", summary.frames_processed);
/// # Ok::<(), avs2yuv::Avs2YuvError>(())
/// ```
pub fn convert<E, P>(
    engine: &mut E,
    script: P,
    output: Option<&mut dyn Write>,
    options: &ConvertOptions,
) -> Result<ConversionSummary, Avs2YuvError>
where
    E: ScriptEngine,
    P: AsRef<Path>,
{
    let mut clip = source::open_normalized(engine, script)?;
    convert_clip(&mut clip, output, options)
}

/// Write the header (when `output` is set) and serialize the selected range
/// of a normalized clip.
pub fn convert_clip<S: FrameSource>(
    clip: &mut S,
    mut output: Option<&mut dyn Write>,
    options: &ConvertOptions,
) -> Result<ConversionSummary, Avs2YuvError> {
    let header_bytes = match output.as_deref_mut() {
        Some(sink) => y4m::write_header(clip.metadata(), sink)?,
        None => 0,
    };

    let total_frames = clip.metadata().frame_count;
    log::info!("total frames: {total_frames}");

    let range = options.range(total_frames);
    let mut summary = y4m::serialize(clip, range, output, options.progress.clone())?;
    summary.bytes_written += header_bytes as u64;

    log::info!(
        "Converted {} frame(s), {} bytes",
        summary.frames_processed,
        summary.bytes_written,
    );
    Ok(summary)
}
