//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides which artifacts to write) and the [`backend`](super::backend)
//! (which does the actual pixel work). Keeping them apart lets tests swap in a
//! mock backend without touching operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 80). Clamped on construction.
//! - [`Rotation`]: Clockwise quarter-turn applied to an original before shrinking.
//! - [`Interpolation`]: Resampling filter: area averaging, cubic, or Lanczos.
//! - [`ResizeParams`]: Source, output path, exact target dimensions, filter, quality.
//! - [`RotateParams`]: Source, output path, rotation, quality.

use std::fmt;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Map a requested angle in degrees. Anything other than 90, 180 or 270
    /// means no rotation.
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees {
            90 => Self::Cw90,
            180 => Self::Cw180,
            270 => Self::Cw270,
            _ => Self::None,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Cw90 => 90,
            Self::Cw180 => 180,
            Self::Cw270 => 270,
        }
    }

    pub fn is_none(self) -> bool {
        self == Self::None
    }

    /// Quarter turns by an odd multiple of 90° swap width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Self::Cw90 | Self::Cw270)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Resampling filter used by a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Box/area averaging. Every source pixel contributes to exactly one
    /// target pixel, which is what you want when shrinking.
    Area,
    /// Catmull-Rom bicubic.
    Cubic,
    /// Lanczos with a window of 3.
    Lanczos,
}

/// Parameters for a resize to exact dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    /// May equal `source`; the file is then replaced.
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub filter: Interpolation,
    pub quality: Quality,
}

/// Parameters for a clockwise rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct RotateParams {
    pub source: PathBuf,
    /// May equal `source`; the file is then replaced.
    pub output: PathBuf,
    pub rotation: Rotation,
    pub quality: Quality,
}
