//! Pure Rust image processing backend (plus libwebp for lossy WebP).
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, BMP, GIF) | `image` crate, format sniffed from content |
//! | Rotate | `DynamicImage::rotate90` / `rotate180` / `rotate270` (clockwise) |
//! | Resize, area | `DynamicImage::thumbnail_exact` (box averaging) |
//! | Resize, cubic | `imageops::resize` with `CatmullRom` |
//! | Resize, Lanczos | `imageops::resize` with `Lanczos3` |
//! | Encode → WebP (lossy) | `webp::Encoder` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with quality |
//! | Encode → anything else | `DynamicImage::save_with_format` (lossless) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{Interpolation, ResizeParams, RotateParams, Rotation};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::BufWriter;
use std::path::Path;

/// Largest edge libwebp can encode.
pub const WEBP_MAX_DIMENSION: u32 = 16383;

/// Largest edge a baseline JPEG can describe.
pub const JPEG_MAX_DIMENSION: u32 = 65535;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk, sniffing the format from its bytes.
///
/// Uploaded files keep the client's filename, so the extension is a hint at
/// best.
fn load_image(path: &Path) -> Result<(DynamicImage, Option<ImageFormat>), BackendError> {
    let reader = ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?;
    let format = reader.format();
    let img = reader.decode().map_err(|e| {
        BackendError::Decode(format!("Failed to decode {}: {}", path.display(), e))
    })?;
    Ok((img, format))
}

fn output_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Save a DynamicImage, choosing the encoder from the output extension.
///
/// `fallback` is the source format, used when the extension names nothing the
/// `image` crate can write.
fn save_image(
    img: &DynamicImage,
    path: &Path,
    quality: u32,
    fallback: Option<ImageFormat>,
) -> Result<(), BackendError> {
    let ext = output_extension(path);
    let format = match ext.as_str() {
        "webp" => return save_webp(img, path, quality),
        "jpg" | "jpeg" => return save_jpeg(img, path, quality),
        other => ImageFormat::from_extension(other)
            .filter(|f| f.writing_enabled())
            .or(fallback),
    };

    match format {
        Some(ImageFormat::WebP) => save_webp(img, path, quality),
        Some(ImageFormat::Jpeg) => save_jpeg(img, path, quality),
        Some(fmt) => img.save_with_format(path, fmt).map_err(|e| {
            BackendError::ProcessingFailed(format!("{:?} encode failed: {}", fmt, e))
        }),
        None => Err(BackendError::ProcessingFailed(format!(
            "Unsupported output format: {}",
            ext
        ))),
    }
}

/// Lossy WebP via libwebp. The `image` crate's own WebP encoder is lossless only.
fn save_webp(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    if img.width() > WEBP_MAX_DIMENSION || img.height() > WEBP_MAX_DIMENSION {
        return Err(BackendError::ProcessingFailed(format!(
            "WebP cannot encode {}x{} (max {} per edge)",
            img.width(),
            img.height(),
            WEBP_MAX_DIMENSION
        )));
    }
    // webp::Encoder only accepts 8-bit RGB / RGBA buffers
    let pixels = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };
    let encoder = webp::Encoder::from_image(&pixels)
        .map_err(|e| BackendError::ProcessingFailed(format!("WebP encoder setup failed: {e}")))?;
    let encoded = encoder
        .encode_simple(false, quality as f32)
        .map_err(|e| BackendError::ProcessingFailed(format!("WebP encode failed: {e:?}")))?;
    std::fs::write(path, &*encoded)?;
    Ok(())
}

fn save_jpeg(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let file = std::fs::File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(writer, quality as u8);
    // JPEG has no alpha channel
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))
}

fn apply_rotation(img: DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation {
        Rotation::None => img,
        Rotation::Cw90 => img.rotate90(),
        Rotation::Cw180 => img.rotate180(),
        Rotation::Cw270 => img.rotate270(),
    }
}

/// Encoder edge limit implied by an output path's extension, if any.
fn encoder_limit(path: &Path) -> Option<u32> {
    match output_extension(path).as_str() {
        "webp" => Some(WEBP_MAX_DIMENSION),
        "jpg" | "jpeg" => Some(JPEG_MAX_DIMENSION),
        _ => None,
    }
}

fn apply_resize(
    img: &DynamicImage,
    width: u32,
    height: u32,
    filter: Interpolation,
) -> DynamicImage {
    match filter {
        // Box averaging only makes sense when every axis shrinks
        Interpolation::Area if width <= img.width() && height <= img.height() => {
            img.thumbnail_exact(width, height)
        }
        Interpolation::Area => img.resize_exact(width, height, FilterType::Triangle),
        Interpolation::Cubic => img.resize_exact(width, height, FilterType::CatmullRom),
        Interpolation::Lanczos => img.resize_exact(width, height, FilterType::Lanczos3),
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::open(path)
            .map_err(BackendError::Io)?
            .with_guessed_format()
            .map_err(BackendError::Io)?
            .into_dimensions()
            .map_err(|e| {
                BackendError::Decode(format!(
                    "Failed to read dimensions of {}: {}",
                    path.display(),
                    e
                ))
            })?;
        Ok(Dimensions { width, height })
    }

    fn probe(&self, bytes: &[u8]) -> Result<Dimensions, BackendError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| BackendError::Decode(format!("Invalid image: {}", e)))?;
        Ok(Dimensions {
            width: img.width(),
            height: img.height(),
        })
    }

    fn rotate(&self, params: &RotateParams) -> Result<Dimensions, BackendError> {
        let (img, format) = load_image(&params.source)?;
        let rotated = apply_rotation(img, params.rotation);
        save_image(&rotated, &params.output, params.quality.value(), format)?;
        Ok(Dimensions {
            width: rotated.width(),
            height: rotated.height(),
        })
    }

    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError> {
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "Cannot resize to {}x{}",
                params.width, params.height
            )));
        }
        // checked before decoding so an oversized target never allocates
        if let Some(limit) = encoder_limit(&params.output) {
            if params.width > limit || params.height > limit {
                return Err(BackendError::ProcessingFailed(format!(
                    "Cannot encode {}x{} to {} (max {} per edge)",
                    params.width,
                    params.height,
                    params.output.display(),
                    limit
                )));
            }
        }
        let (img, format) = load_image(&params.source)?;
        let resized = apply_resize(&img, params.width, params.height, params.filter);
        save_image(&resized, &params.output, params.quality.value(), format)
    }
}
