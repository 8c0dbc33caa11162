//! Error types for the `avs2yuv` crate.
//!
//! This module defines [`Avs2YuvError`], the unified error type returned by all
//! fallible operations in the crate, and [`ErrorCategory`], which groups the
//! variants into the four failure classes a run can end with. Errors carry
//! enough context (script path, frame index, plane, byte counts) to be
//! reported without additional logging at the call site.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

use crate::{metadata::PixelFormat, plane::Plane};

/// The broad class a failure belongs to.
///
/// Every class is terminal for the run; nothing is retried internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad or missing arguments. Reported before the engine is touched.
    Configuration,
    /// The clip cannot be represented as progressive planar 4:2:0.
    Format,
    /// The script engine failed while opening the script or fetching a frame.
    Engine,
    /// The destination could not be opened or a plane was written short.
    Io,
}

impl ErrorCategory {
    /// Process exit status used by the command-line tool.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorCategory::Configuration => 2,
            ErrorCategory::Format | ErrorCategory::Engine | ErrorCategory::Io => 1,
        }
    }
}

/// The unified error type for all `avs2yuv` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Avs2YuvError {
    /// Invalid command-line or option values.
    #[error("{0}")]
    Usage(String),

    /// The engine could not evaluate the script into a video clip.
    #[error("Failed to open script {path}: {reason}")]
    ScriptOpen {
        /// Path of the script that was imported.
        path: PathBuf,
        /// Underlying reason reported by the engine.
        reason: String,
    },

    /// The clip is still not planar 4:2:0 after the single conversion attempt.
    #[error("Couldn't convert input to YV12 (clip format is {format})")]
    UnsupportedFormat {
        /// Pixel format the clip reported after conversion.
        format: PixelFormat,
    },

    /// The clip is field-based; deinterlacing is not attempted.
    #[error("Needs progressive input")]
    InterlacedSource,

    /// The engine raised a fault while producing a specific frame.
    #[error("Engine error at frame {frame_number}: {reason}")]
    FrameFetch {
        /// Index of the frame that was being fetched.
        frame_number: u64,
        /// Underlying reason reported by the engine.
        reason: String,
    },

    /// A frame handle did not expose one of the Y, U, V planes.
    #[error("Frame {frame_number} has no {plane} plane")]
    MissingPlane {
        /// Index of the offending frame.
        frame_number: u64,
        /// The plane that was missing.
        plane: Plane,
    },

    /// Fewer bytes than a full plane reached the destination.
    #[error("Output error: wrote only {written} of {expected} bytes ({plane} plane)")]
    ShortWrite {
        /// The plane being written.
        plane: Plane,
        /// Bytes accepted by the destination.
        written: usize,
        /// Bytes in a tightly packed plane.
        expected: usize,
    },

    /// The destination could not be opened.
    #[error("Failed to open output {path}: {reason}")]
    OutputOpen {
        /// Requested output path.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// An error originating from the FFmpeg libraries outside of a frame fetch.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error while writing the stream header or flushing the output.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl Avs2YuvError {
    /// The failure class of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Avs2YuvError::Usage(_) => ErrorCategory::Configuration,
            Avs2YuvError::UnsupportedFormat { .. }
            | Avs2YuvError::InterlacedSource
            | Avs2YuvError::MissingPlane { .. } => ErrorCategory::Format,
            Avs2YuvError::ScriptOpen { .. }
            | Avs2YuvError::FrameFetch { .. }
            | Avs2YuvError::FfmpegError(_) => ErrorCategory::Engine,
            Avs2YuvError::ShortWrite { .. }
            | Avs2YuvError::OutputOpen { .. }
            | Avs2YuvError::IoError(_) => ErrorCategory::Io,
        }
    }

    /// Process exit status for this error: 2 for usage errors, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    /// The failing frame index, when the error is tied to one.
    pub fn frame_number(&self) -> Option<u64> {
        match self {
            Avs2YuvError::FrameFetch { frame_number, .. }
            | Avs2YuvError::MissingPlane { frame_number, .. } => Some(*frame_number),
            _ => None,
        }
    }
}

impl From<FfmpegError> for Avs2YuvError {
    fn from(error: FfmpegError) -> Self {
        Avs2YuvError::FfmpegError(error.to_string())
    }
}
