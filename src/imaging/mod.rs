//! Image processing: `image` crate decoders, libwebp for lossy output.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify / probe** | `ImageReader::into_dimensions`, `image::load_from_memory` |
//! | **Rotate** | clockwise quarter turns, written back in the source's format |
//! | **Shrink** | area averaging → lossy WebP (or JPEG) |
//! | **Restore** | cubic re-encode, Lanczos resize-back |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    format_resolution, format_savings, rotated_dimensions, scaled_height, size_ratio,
};
pub use operations::{
    ShrinkConfig, ShrinkOutcome, conform_dimensions, cubic_reencode, get_dimensions,
    shrink_original,
};
pub use params::{Interpolation, Quality, ResizeParams, RotateParams, Rotation};
pub use rust_backend::{JPEG_MAX_DIMENSION, RustBackend, WEBP_MAX_DIMENSION};
