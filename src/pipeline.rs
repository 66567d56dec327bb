//! Shrink and upscale orchestration.
//!
//! The [`Pipeline`] ties storage, the imaging backend, the upscaler chain and
//! the catalog together. It is synchronous: the HTTP layer runs each call on
//! the blocking pool, the CLI calls it directly.
//!
//! ## Shrink
//!
//! ```text
//! bytes ──probe──▶ originals/<key> ──rotate (in place)──▶ area resize ──▶ shrunk/<stem>.webp
//! ```
//!
//! Bytes are decoded in memory before anything touches the disk, so an
//! upload that is not an image leaves no trace.
//!
//! ## Upscale
//!
//! ```text
//! originals/<key> (any day) ──upscaler──▶ upscaled/upscaled_<key> ──Lanczos──▶ original's size
//! ```
//!
//! The upscaled artifact always ends up with exactly the original's
//! dimensions, whatever the upscaler produced.

use crate::catalog::{Catalog, CatalogEntry};
use crate::config::{AppConfig, ShrunkFormat};
use crate::imaging::{
    BackendError, Dimensions, ImageBackend, Quality, Rotation, RustBackend, ShrinkConfig,
    conform_dimensions, format_resolution, format_savings, get_dimensions, rotated_dimensions,
    scaled_height, shrink_original,
};
use crate::naming;
use crate::storage::{Located, Storage, Subfolder};
use crate::upscaler::{UpscaleError, Upscaler, default_chain};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Resolution shown for an artifact that does not exist.
pub const MISSING_RESOLUTION: &str = "N/A";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid filename: {0:?}")]
    InvalidFilename(String),
    #[error("invalid width: {0}")]
    InvalidWidth(String),
    #[error("not a decodable image: {0}")]
    InvalidImage(String),
    #[error("no stored original named {0:?}")]
    NotFound(String),
    #[error("no upscaler is available")]
    NoUpscaler,
    #[error("upscale failed: {0}")]
    Upscale(#[from] UpscaleError),
    #[error("image processing failed: {0}")]
    Imaging(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl PipelineError {
    /// The request itself was bad; retrying it unchanged cannot succeed.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFilename(_) | Self::InvalidWidth(_) | Self::InvalidImage(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFilename(_) => "INVALID_FILENAME",
            Self::InvalidWidth(_) => "INVALID_WIDTH",
            Self::InvalidImage(_) => "INVALID_IMAGE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::NoUpscaler => "NO_UPSCALER",
            Self::Upscale(_) => "UPSCALE_FAILED",
            Self::Imaging(_) => "PROCESSING_FAILED",
            Self::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Tunables the pipeline needs from the application config.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub default_width: u32,
    pub shrunk_quality: Quality,
    pub shrunk_format: ShrunkFormat,
    pub original_quality: Quality,
    /// URL prefix artifacts are served under.
    pub mount: String,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            default_width: config.shrink.default_width,
            shrunk_quality: Quality::new(config.shrink.quality),
            shrunk_format: config.shrink.format,
            original_quality: Quality::new(config.originals.quality),
            mount: config.server.mount.clone(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Result of a shrink, as returned to API clients.
#[derive(Debug, Clone, Serialize)]
pub struct ShrinkReport {
    pub relative_url: String,
    pub original_url: String,
    pub width: u32,
    pub height: u32,
    pub savings: String,
    #[serde(skip)]
    pub original_path: PathBuf,
    #[serde(skip)]
    pub shrunk_path: PathBuf,
}

/// Result of an upscale, as returned to API clients.
#[derive(Debug, Clone, Serialize)]
pub struct UpscaleReport {
    pub original_url: String,
    pub shrunk_url: Option<String>,
    pub upscaled_url: String,
    pub orig_res: String,
    pub shrunk_res: String,
    pub up_res: String,
    /// Upscaler that produced the artifact.
    #[serde(skip)]
    pub upscaler: String,
    #[serde(skip)]
    pub upscaled_path: PathBuf,
}

/// Every stored artifact for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locations {
    pub key: String,
    pub original: Option<Located>,
    pub shrunk: Option<Located>,
    pub upscaled: Option<Located>,
}

pub struct Pipeline {
    storage: Storage,
    backend: Arc<dyn ImageBackend>,
    upscalers: Vec<Arc<dyn Upscaler>>,
    settings: PipelineSettings,
    catalog_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        storage: Storage,
        backend: Arc<dyn ImageBackend>,
        upscalers: Vec<Arc<dyn Upscaler>>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            storage,
            backend,
            upscalers,
            settings,
            catalog_lock: Mutex::new(()),
        }
    }

    /// Production wiring: [`RustBackend`], the configured external upscaler
    /// and the cubic fallback.
    pub fn from_config(config: &AppConfig, storage: Storage) -> Self {
        let settings = PipelineSettings::from_config(config);
        let backend: Arc<dyn ImageBackend> = Arc::new(RustBackend::new());
        let upscalers =
            default_chain(&config.upscaler, backend.clone(), settings.original_quality);
        Self::new(storage, backend, upscalers, settings)
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// URL of an artifact under the static mount.
    pub fn url_for(&self, located: &Located) -> String {
        format!("{}/{}", self.settings.mount, located.relative_path())
    }

    // =========================================================================
    // Shrink
    // =========================================================================

    /// Store `bytes` as the original for `filename`, optionally rotate it in
    /// place, and write a lossy copy `width` pixels wide.
    ///
    /// `width` defaults to the configured default width. Both the width and
    /// the resulting height must fit the shrunk format's encoder.
    pub fn shrink(
        &self,
        filename: &str,
        bytes: &[u8],
        width: Option<u32>,
        rotation: Rotation,
    ) -> Result<ShrinkReport> {
        validate_key(filename)?;
        let width = width.unwrap_or(self.settings.default_width);
        let limit = self.settings.shrunk_format.max_dimension();
        if width == 0 {
            return Err(PipelineError::InvalidWidth(
                "width must be at least 1".to_string(),
            ));
        }
        if width > limit {
            return Err(PipelineError::InvalidWidth(format!(
                "width {width} exceeds the {limit} pixel limit"
            )));
        }

        let decoded = self.backend.probe(bytes).map_err(|e| match e {
            BackendError::Decode(msg) => PipelineError::InvalidImage(msg),
            other => PipelineError::Imaging(other),
        })?;
        let height = scaled_height(rotated_dimensions(decoded.as_tuple(), rotation), width);
        if height > limit {
            return Err(PipelineError::InvalidWidth(format!(
                "width {width} gives a height of {height}, over the {limit} pixel limit"
            )));
        }
        tracing::info!(%filename, %decoded, width, %rotation, "shrinking");

        let original = self.storage.today_target(Subfolder::Originals, filename)?;
        std::fs::write(&original.path, bytes)?;

        let shrunk_name =
            naming::shrunk_filename(filename, self.settings.shrunk_format.extension());
        let shrunk = self.storage.today_target(Subfolder::Shrunk, &shrunk_name)?;

        let outcome = shrink_original(
            self.backend.as_ref(),
            &original.path,
            &shrunk.path,
            decoded,
            &ShrinkConfig {
                width,
                rotation,
                quality: self.settings.shrunk_quality,
                original_quality: self.settings.original_quality,
            },
        )?;

        // measured after rotation, which may have re-encoded the original
        let original_bytes = std::fs::metadata(&original.path)?.len();
        let shrunk_bytes = std::fs::metadata(&shrunk.path)?.len();
        let savings = format_savings(original_bytes, shrunk_bytes);

        self.record(
            filename,
            &[
                (&original, outcome.original, original_bytes),
                (&shrunk, outcome.shrunk, shrunk_bytes),
            ],
        );

        tracing::info!(
            %filename,
            original = %outcome.original,
            shrunk = %outcome.shrunk,
            %savings,
            "shrink complete"
        );

        Ok(ShrinkReport {
            relative_url: self.url_for(&shrunk),
            original_url: self.url_for(&original),
            width: outcome.shrunk.width,
            height: outcome.shrunk.height,
            savings,
            original_path: original.path,
            shrunk_path: shrunk.path,
        })
    }

    // =========================================================================
    // Upscale
    // =========================================================================

    /// Upscale the stored original named `key` into today's bucket.
    pub fn upscale(&self, key: &str) -> Result<UpscaleReport> {
        validate_key(key)?;
        let catalog = self.load_catalog();

        let original = self
            .resolve(&catalog, Subfolder::Originals, key, key)?
            .ok_or_else(|| PipelineError::NotFound(key.to_string()))?;
        let original_dims = get_dimensions(self.backend.as_ref(), &original.path)?;

        let shrunk = self.resolve(&catalog, Subfolder::Shrunk, key, &self.shrunk_name(key))?;
        let shrunk_res = shrunk
            .as_ref()
            .map(|s| self.resolution_of(s))
            .unwrap_or_else(|| MISSING_RESOLUTION.to_string());

        let upscaler = self.select_upscaler()?;
        let target = self
            .storage
            .today_target(Subfolder::Upscaled, &naming::upscaled_filename(key))?;
        let staging = staging_path(&target);
        tracing::info!(
            %key,
            original = %original.relative_path(),
            upscaler = upscaler.name(),
            "upscaling"
        );

        // a previous artifact at the target stays in place until this run succeeds
        let outcome = self
            .enhance_and_conform(upscaler.as_ref(), &original.path, &staging, original_dims)
            .and_then(|dims| {
                std::fs::rename(&staging, &target.path)?;
                Ok(dims)
            });
        let up_dims = match outcome {
            Ok(dims) => dims,
            Err(e) => {
                discard_partial(&staging);
                return Err(e);
            }
        };

        let up_bytes = std::fs::metadata(&target.path)?.len();
        self.record(key, &[(&target, up_dims, up_bytes)]);
        tracing::info!(%key, upscaled = %target.relative_path(), "upscale complete");

        Ok(UpscaleReport {
            original_url: self.url_for(&original),
            shrunk_url: shrunk.as_ref().map(|s| self.url_for(s)),
            upscaled_url: self.url_for(&target),
            orig_res: format_resolution(original_dims.as_tuple()),
            shrunk_res,
            up_res: format_resolution(up_dims.as_tuple()),
            upscaler: upscaler.name().to_string(),
            upscaled_path: target.path,
        })
    }

    fn enhance_and_conform(
        &self,
        upscaler: &dyn Upscaler,
        original: &Path,
        output: &Path,
        original_dims: Dimensions,
    ) -> Result<Dimensions> {
        upscaler.enhance(original, output)?;
        if let Some(produced) = conform_dimensions(
            self.backend.as_ref(),
            output,
            original_dims,
            self.settings.original_quality,
        )? {
            tracing::info!(%produced, restored = %original_dims, "resized upscaled image back");
        }
        Ok(original_dims)
    }

    /// First upscaler that reports itself available.
    fn select_upscaler(&self) -> Result<&Arc<dyn Upscaler>> {
        for upscaler in &self.upscalers {
            if upscaler.is_available() {
                return Ok(upscaler);
            }
            tracing::debug!(upscaler = upscaler.name(), "upscaler unavailable");
        }
        Err(PipelineError::NoUpscaler)
    }

    fn resolution_of(&self, located: &Located) -> String {
        match get_dimensions(self.backend.as_ref(), &located.path) {
            Ok(dims) => format_resolution(dims.as_tuple()),
            Err(e) => {
                tracing::warn!(path = %located.path.display(), error = %e, "unreadable artifact");
                MISSING_RESOLUTION.to_string()
            }
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Every artifact stored for `key`. Fails with not-found when there is
    /// none at all.
    pub fn locate(&self, key: &str) -> Result<Locations> {
        validate_key(key)?;
        let catalog = self.load_catalog();
        let locations = Locations {
            key: key.to_string(),
            original: self.resolve(&catalog, Subfolder::Originals, key, key)?,
            shrunk: self.resolve(&catalog, Subfolder::Shrunk, key, &self.shrunk_name(key))?,
            upscaled: self.resolve(
                &catalog,
                Subfolder::Upscaled,
                key,
                &naming::upscaled_filename(key),
            )?,
        };
        if locations.original.is_none()
            && locations.shrunk.is_none()
            && locations.upscaled.is_none()
        {
            return Err(PipelineError::NotFound(key.to_string()));
        }
        Ok(locations)
    }

    /// Snapshot of the catalog.
    pub fn catalog(&self) -> Catalog {
        self.load_catalog()
    }

    fn shrunk_name(&self, key: &str) -> String {
        naming::shrunk_filename(key, self.settings.shrunk_format.extension())
    }

    /// Newest catalog entry still on disk, else the newest bucket holding
    /// `filename`.
    fn resolve(
        &self,
        catalog: &Catalog,
        subfolder: Subfolder,
        key: &str,
        filename: &str,
    ) -> Result<Option<Located>> {
        for entry in catalog.recorded(key, subfolder) {
            if let Some(date) = entry.bucket() {
                if let Some(found) = self.storage.existing(date, subfolder, &entry.file) {
                    return Ok(Some(found));
                }
            }
        }
        Ok(self.storage.find(subfolder, filename)?)
    }

    fn load_catalog(&self) -> Catalog {
        let _guard = self.catalog_lock.lock().unwrap_or_else(|e| e.into_inner());
        Catalog::load(self.storage.root())
    }

    /// Add written artifacts to the catalog. Failure to save is logged, not
    /// returned: the artifacts themselves are already on disk.
    fn record(&self, key: &str, written: &[(&Located, Dimensions, u64)]) {
        let _guard = self.catalog_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut catalog = Catalog::load(self.storage.root());
        for (located, dims, bytes) in written {
            catalog.record(
                key,
                CatalogEntry {
                    kind: located.subfolder,
                    date: naming::bucket_name(located.date),
                    file: located.filename.clone(),
                    width: dims.width,
                    height: dims.height,
                    bytes: *bytes,
                },
            );
        }
        if let Err(e) = catalog.save(self.storage.root()) {
            tracing::warn!(error = %e, "failed to save catalog");
        }
    }
}

fn validate_key(key: &str) -> Result<()> {
    if naming::is_valid_key(key) {
        Ok(())
    } else {
        Err(PipelineError::InvalidFilename(key.to_string()))
    }
}

/// Sibling of `target` the upscaler writes to. Keeps the extension so tools
/// that pick the output format from it still do.
fn staging_path(target: &Located) -> PathBuf {
    target.path.with_file_name(format!(".partial.{}", target.filename))
}

/// Remove whatever a failed upscale left at the staging path.
fn discard_partial(staging: &Path) {
    if staging.exists() {
        if let Err(e) = std::fs::remove_file(staging) {
            tracing::warn!(
                path = %staging.display(),
                error = %e,
                "could not remove partial output"
            );
        }
    }
}
