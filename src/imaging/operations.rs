//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::scaled_height;
use super::params::{Interpolation, Quality, ResizeParams, RotateParams, Rotation};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &dyn ImageBackend, path: &Path) -> Result<Dimensions> {
    backend.identify(path)
}

/// Configuration for a shrink.
#[derive(Debug, Clone)]
pub struct ShrinkConfig {
    /// Target width; height follows the aspect ratio.
    pub width: u32,
    /// Applied to the original, in place, before shrinking.
    pub rotation: Rotation,
    /// Encoding quality of the shrunk derivative.
    pub quality: Quality,
    /// Encoding quality used when rotation re-encodes the original.
    pub original_quality: Quality,
}

/// What a shrink produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShrinkOutcome {
    /// Dimensions of the stored original after any rotation.
    pub original: Dimensions,
    pub shrunk: Dimensions,
}

/// Plan the resize half of a shrink without executing it.
pub fn plan_shrink(
    original: &Path,
    output: &Path,
    original_dims: Dimensions,
    config: &ShrinkConfig,
) -> ResizeParams {
    ResizeParams {
        source: original.to_path_buf(),
        output: output.to_path_buf(),
        width: config.width,
        height: scaled_height(original_dims.as_tuple(), config.width),
        filter: Interpolation::Area,
        quality: config.quality,
    }
}

/// Rotate the stored original (if asked) and write the shrunk derivative.
///
/// `decoded` are the dimensions of the original as uploaded. Rotation
/// overwrites `original`; there is no way back.
pub fn shrink_original(
    backend: &dyn ImageBackend,
    original: &Path,
    output: &Path,
    decoded: Dimensions,
    config: &ShrinkConfig,
) -> Result<ShrinkOutcome> {
    let original_dims = if config.rotation.is_none() {
        decoded
    } else {
        backend.rotate(&RotateParams {
            source: original.to_path_buf(),
            output: original.to_path_buf(),
            rotation: config.rotation,
            quality: config.original_quality,
        })?
    };

    let params = plan_shrink(original, output, original_dims, config);
    backend.resize(&params)?;

    Ok(ShrinkOutcome {
        original: original_dims,
        shrunk: Dimensions::new(params.width, params.height),
    })
}

/// Re-encode `source` into `output` at its own dimensions with cubic
/// interpolation. Returns those dimensions.
pub fn cubic_reencode(
    backend: &dyn ImageBackend,
    source: &Path,
    output: &Path,
    quality: Quality,
) -> Result<Dimensions> {
    let dims = backend.identify(source)?;
    backend.resize(&ResizeParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        width: dims.width,
        height: dims.height,
        filter: Interpolation::Cubic,
        quality,
    })?;
    Ok(dims)
}

/// Force `path` to exactly `target`, resizing in place with Lanczos when the
/// current dimensions differ.
///
/// Returns the dimensions the file had before, if a resize happened.
pub fn conform_dimensions(
    backend: &dyn ImageBackend,
    path: &Path,
    target: Dimensions,
    quality: Quality,
) -> Result<Option<Dimensions>> {
    let actual = backend.identify(path)?;
    if actual == target {
        return Ok(None);
    }
    backend.resize(&ResizeParams {
        source: path.to_path_buf(),
        output: path.to_path_buf(),
        width: target.width,
        height: target.height,
        filter: Interpolation::Lanczos,
        quality,
    })?;
    Ok(Some(actual))
}
