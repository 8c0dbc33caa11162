//! Clip metadata types.
//!
//! [`ClipMetadata`] is produced once when a script is imported and again only
//! if the clip goes through conversion. It is immutable for the rest of a run.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Exact frame rate as a rational number of frames per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRate {
    /// Numerator (frames).
    pub numerator: u32,
    /// Denominator (seconds).
    pub denominator: u32,
}

impl FrameRate {
    /// Create a frame rate of `numerator / denominator` frames per second.
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Returns `true` when both terms are positive.
    pub fn is_valid(&self) -> bool {
        self.numerator > 0 && self.denominator > 0
    }

    /// Approximate frames per second as a float. Zero for an invalid rate.
    pub fn as_f64(&self) -> f64 {
        if self.denominator == 0 {
            0.0
        } else {
            self.numerator as f64 / self.denominator as f64
        }
    }
}

/// Prints `30` for `30/1` and `30000/1001` otherwise.
impl Display for FrameRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

/// Pixel layout of a clip.
///
/// Only [`PixelFormat::Yuv420p`] can be serialized; every other variant needs
/// to go through the engine's conversion first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// Planar Y, U, V with 2x2 chroma subsampling (AviSynth `YV12`).
    Yuv420p,
    /// Packed 4:2:2 (`YUY2`).
    Yuyv422,
    /// Planar 4:2:2.
    Yuv422p,
    /// Planar 4:4:4.
    Yuv444p,
    /// Packed 24-bit RGB or BGR.
    Rgb24,
    /// Packed 32-bit RGB with alpha or padding.
    Rgb32,
    /// Single luma plane.
    Gray8,
    /// Any other layout, by engine-reported name.
    Other(String),
}

impl PixelFormat {
    /// Returns `true` for the only layout the serializer accepts.
    pub fn is_planar_yuv420(&self) -> bool {
        matches!(self, PixelFormat::Yuv420p)
    }

    /// Short family name used in conversion notices.
    pub fn family_name(&self) -> &str {
        match self {
            PixelFormat::Yuv420p => "YV12",
            PixelFormat::Yuyv422 => "YUY2",
            PixelFormat::Yuv422p => "YV16",
            PixelFormat::Yuv444p => "YV24",
            PixelFormat::Rgb24 | PixelFormat::Rgb32 => "RGB",
            PixelFormat::Gray8 => "Y8",
            PixelFormat::Other(name) => name,
        }
    }
}

impl Display for PixelFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.family_name())
    }
}

/// Whether frames hold whole pictures or separated fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScanType {
    /// Whole frames.
    #[default]
    Progressive,
    /// Frames carry separated fields.
    FieldBased,
}

/// Metadata for an imported clip.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct ClipMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Exact frame rate.
    pub frame_rate: FrameRate,
    /// Total number of frames the clip can produce.
    pub frame_count: u64,
    /// Pixel layout of the frames.
    pub pixel_format: PixelFormat,
    /// Progressive or field-based.
    pub scan_type: ScanType,
}

impl ClipMetadata {
    /// Bytes of one serialized frame body (the three tightly packed planes).
    pub fn frame_size(&self) -> usize {
        crate::plane::Plane::ALL
            .iter()
            .map(|plane| {
                let (width, height) = plane.dimensions(self.width, self.height);
                width * height
            })
            .sum()
    }
}

/// `WxH, F fps, N frames`.
impl Display for ClipMetadata {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{}x{}, {} fps, {} frames",
            self.width, self.height, self.frame_rate, self.frame_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(width: u32, height: u32) -> ClipMetadata {
        ClipMetadata {
            width,
            height,
            frame_rate: FrameRate::new(30, 1),
            frame_count: 2,
            pixel_format: PixelFormat::Yuv420p,
            scan_type: ScanType::Progressive,
        }
    }

    #[test]
    fn frame_rate_display_omits_unit_denominator() {
        assert_eq!(FrameRate::new(25, 1).to_string(), "25");
        assert_eq!(FrameRate::new(30000, 1001).to_string(), "30000/1001");
    }

    #[test]
    fn frame_rate_validity() {
        assert!(FrameRate::new(24, 1).is_valid());
        assert!(!FrameRate::new(0, 1).is_valid());
        assert!(!FrameRate::new(24, 0).is_valid());
        assert_eq!(FrameRate::new(24, 0).as_f64(), 0.0);
    }

    #[test]
    fn frame_size_counts_subsampled_chroma() {
        assert_eq!(metadata(4, 4).frame_size(), 24);
        assert_eq!(metadata(5, 3).frame_size(), 15 + 2 + 2);
    }

    #[test]
    fn summary_line() {
        assert_eq!(metadata(4, 4).to_string(), "4x4, 30 fps, 2 frames");
    }
}
