//! Planes of a 4:2:0 frame.
//!
//! A [`PlaneView`] borrows one plane of a fetched frame as a byte slice plus
//! its row stride. Rows may be padded past the logical width; the padding is
//! never part of the serialized stream.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// One colour plane of a planar YUV frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plane {
    /// Luma.
    Y,
    /// Blue-difference chroma.
    U,
    /// Red-difference chroma.
    V,
}

impl Plane {
    /// All planes, in stream order.
    pub const ALL: [Plane; 3] = [Plane::Y, Plane::U, Plane::V];

    /// Logical `(width, height)` of this plane for a frame of the given size.
    ///
    /// Chroma planes are halved by a right shift, so odd luma dimensions lose
    /// their trailing chroma row or column.
    pub fn dimensions(self, width: u32, height: u32) -> (usize, usize) {
        let shift = match self {
            Plane::Y => 0,
            Plane::U | Plane::V => 1,
        };
        ((width >> shift) as usize, (height >> shift) as usize)
    }

    /// Zero-based position of the plane in a planar buffer.
    pub fn index(self) -> usize {
        match self {
            Plane::Y => 0,
            Plane::U => 1,
            Plane::V => 2,
        }
    }
}

impl Display for Plane {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Plane::Y => "Y",
            Plane::U => "U",
            Plane::V => "V",
        };
        f.write_str(name)
    }
}

/// Borrowed pixel rows of one plane.
#[derive(Debug, Clone, Copy)]
pub struct PlaneView<'a> {
    data: &'a [u8],
    stride: usize,
}

impl<'a> PlaneView<'a> {
    /// Wrap `data`, where consecutive rows start `stride` bytes apart.
    pub fn new(data: &'a [u8], stride: usize) -> Self {
        Self { data, stride }
    }

    /// Distance in bytes between the starts of two consecutive rows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The first `width` bytes of row `row`.
    ///
    /// Returns a shorter (possibly empty) slice if the buffer ends early.
    pub fn row(&self, row: usize, width: usize) -> &'a [u8] {
        let start = row.saturating_mul(self.stride).min(self.data.len());
        let end = start.saturating_add(width).min(self.data.len());
        &self.data[start..end]
    }
}
