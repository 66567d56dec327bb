//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations every backend must
//! support: identify, probe, rotate, and resize.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate plus `webp` for lossy WebP output.

use super::params::{ResizeParams, RotateParams};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The bytes are not an image any compiled-in decoder understands.
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Trait for image processing backends.
///
/// Output encoding is chosen from the output path's extension. When the
/// extension names no encodable format, the source's detected format is used.
pub trait ImageBackend: Send + Sync {
    /// Read dimensions from a file on disk.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Fully decode in-memory bytes and report their dimensions.
    ///
    /// Used to reject bad uploads before anything is written.
    fn probe(&self, bytes: &[u8]) -> Result<Dimensions, BackendError>;

    /// Rotate clockwise and write the result. Returns the new dimensions.
    fn rotate(&self, params: &RotateParams) -> Result<Dimensions, BackendError>;

    /// Resize to exactly `width` x `height` and write the result.
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError>;
}
