//! Frame source adapter.
//!
//! A [`ScriptEngine`] evaluates a script into a clip and owns the colourspace
//! conversion capability. The clip it returns is a [`FrameSource`]: immutable
//! [`ClipMetadata`] plus on-demand frame fetching. A fetched frame is a
//! [`SourceFrame`] that mutably borrows its clip, so at most one frame is
//! alive at a time and it is released exactly once, when dropped.
//!
//! [`open_normalized`] runs the whole adapter sequence: import, at most one
//! conversion to planar 4:2:0, then the progressive-scan check.
//!
//! # Example
//!
//! ```no_run
//! use avs2yuv::{FfmpegEngine, FrameSource, source};
//!
//! let mut engine = FfmpegEngine::new()?;
//! let clip = source::open_normalized(&mut engine, "input.avs")?;
//! println!("{}", clip.metadata());
//! # Ok::<(), avs2yuv::Avs2YuvError>(())
//! ```

use std::path::Path;

use crate::{
    error::Avs2YuvError,
    metadata::{ClipMetadata, ScanType},
    plane::{Plane, PlaneView},
};

/// One fetched frame.
///
/// Dropping the value releases it back to the engine.
pub trait SourceFrame {
    /// Borrow one plane, or `None` if the frame does not carry it.
    fn plane(&self, plane: Plane) -> Option<PlaneView<'_>>;
}

/// A clip: metadata plus per-index frame retrieval.
pub trait FrameSource {
    /// Frame handle type, borrowing the clip while alive.
    type Frame<'a>: SourceFrame
    where
        Self: 'a;

    /// Metadata of the clip as delivered by [`fetch`](FrameSource::fetch).
    fn metadata(&self) -> &ClipMetadata;

    /// Produce frame `frame_number`.
    ///
    /// Engine faults are reported as [`Avs2YuvError::FrameFetch`] carrying the
    /// failing index.
    fn fetch(&mut self, frame_number: u64) -> Result<Self::Frame<'_>, Avs2YuvError>;
}

/// A script evaluation environment.
///
/// The value is a scoped resource: creating it acquires the environment and
/// dropping it releases it, on success and error paths alike.
pub trait ScriptEngine {
    /// Clip type produced by this engine.
    type Clip: FrameSource;

    /// Evaluate the script at `path` into a video clip.
    fn import(&mut self, path: &Path) -> Result<Self::Clip, Avs2YuvError>;

    /// Convert `clip` to planar 4:2:0.
    ///
    /// The result is not trusted: callers check its metadata again.
    fn convert_to_yuv420(&mut self, clip: Self::Clip) -> Result<Self::Clip, Avs2YuvError>;
}

/// Returns `true` if `path` carries an `.avs` extension.
///
/// Other inputs may still open fine; this only drives a warning.
pub fn looks_like_avisynth_script(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension == "avs")
}

/// Import the script at `path`.
pub fn open_clip<E: ScriptEngine>(engine: &mut E, path: &Path) -> Result<E::Clip, Avs2YuvError> {
    log::debug!("Importing script: {}", path.display());

    let clip = engine.import(path)?;

    log::info!("{}: {}", path.display(), clip.metadata());
    Ok(clip)
}

/// Bring `clip` to planar 4:2:0.
///
/// Clips already in the target layout pass through untouched. Otherwise the
/// engine's conversion runs once; if the converted clip is still not planar
/// 4:2:0 the run fails with [`Avs2YuvError::UnsupportedFormat`].
pub fn normalize<E: ScriptEngine>(engine: &mut E, clip: E::Clip) -> Result<E::Clip, Avs2YuvError> {
    if clip.metadata().pixel_format.is_planar_yuv420() {
        return Ok(clip);
    }

    log::info!("converting {} -> YV12", clip.metadata().pixel_format);
    let converted = engine.convert_to_yuv420(clip)?;

    let format = &converted.metadata().pixel_format;
    if !format.is_planar_yuv420() {
        return Err(Avs2YuvError::UnsupportedFormat {
            format: format.clone(),
        });
    }

    Ok(converted)
}

/// Reject field-based clips. Must run after [`normalize`].
pub fn validate_progressive(metadata: &ClipMetadata) -> Result<(), Avs2YuvError> {
    match metadata.scan_type {
        ScanType::Progressive => Ok(()),
        ScanType::FieldBased => Err(Avs2YuvError::InterlacedSource),
    }
}

/// Import, normalize, and validate a clip in one step.
pub fn open_normalized<E, P>(engine: &mut E, path: P) -> Result<E::Clip, Avs2YuvError>
where
    E: ScriptEngine,
    P: AsRef<Path>,
{
    let clip = open_clip(engine, path.as_ref())?;
    let clip = normalize(engine, clip)?;
    validate_progressive(clip.metadata())?;
    Ok(clip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avs_extension_is_recognised() {
        assert!(looks_like_avisynth_script(Path::new("movie.avs")));
        assert!(!looks_like_avisynth_script(Path::new("movie.vpy")));
        assert!(!looks_like_avisynth_script(Path::new("movie")));
        assert!(!looks_like_avisynth_script(Path::new("movie.avs.bak")));
    }
}
