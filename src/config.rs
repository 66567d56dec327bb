//! Application configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! serialized to a TOML table and the user file is merged on top of it key by
//! key, so a config file only needs the values it changes.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! storage_root = "storage"   # Root of the date-bucketed artifact tree
//!
//! [shrink]
//! default_width = 1280       # Width used when a request does not name one
//! quality = 80               # Lossy quality of shrunk copies (1-100)
//! format = "webp"            # "webp" or "jpeg"
//!
//! [originals]
//! quality = 95               # Re-encode quality when rotation rewrites an original
//!
//! [upscaler]
//! program = "python"
//! script = "inference_realesrgan.py"
//! model = "RealESRGAN_x4plus"
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! mount = "view_storage"     # URL prefix the storage root is served under
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{JPEG_MAX_DIMENSION, WEBP_MAX_DIMENSION};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Root directory of the artifact tree.
    pub storage_root: String,
    pub shrink: ShrinkSettings,
    pub originals: OriginalsSettings,
    pub upscaler: UpscalerConfig,
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_root: "storage".to_string(),
            shrink: ShrinkSettings::default(),
            originals: OriginalsSettings::default(),
            upscaler: UpscalerConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_root.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage_root must not be empty".into(),
            ));
        }
        if !(1..=100).contains(&self.shrink.quality) {
            return Err(ConfigError::Validation(
                "shrink.quality must be 1-100".into(),
            ));
        }
        if !(1..=100).contains(&self.originals.quality) {
            return Err(ConfigError::Validation(
                "originals.quality must be 1-100".into(),
            ));
        }
        if self.shrink.default_width == 0 {
            return Err(ConfigError::Validation(
                "shrink.default_width must be at least 1".into(),
            ));
        }
        if self.upscaler.program.trim().is_empty() {
            return Err(ConfigError::Validation(
                "upscaler.program must not be empty".into(),
            ));
        }
        if self.upscaler.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "upscaler.model must not be empty".into(),
            ));
        }
        if self.server.mount.is_empty() || self.server.mount.contains('/') {
            return Err(ConfigError::Validation(
                "server.mount must be a single non-empty path segment".into(),
            ));
        }
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "server.bind is not a socket address: {}",
                self.server.bind
            )));
        }
        Ok(())
    }
}

/// Lossy format of shrunk copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShrunkFormat {
    Webp,
    Jpeg,
}

impl ShrunkFormat {
    /// File extension written for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Jpeg => "jpg",
        }
    }

    /// Largest edge the encoder for this format accepts.
    pub fn max_dimension(self) -> u32 {
        match self {
            Self::Webp => WEBP_MAX_DIMENSION,
            Self::Jpeg => JPEG_MAX_DIMENSION,
        }
    }
}

/// Shrink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShrinkSettings {
    /// Target width when a request does not specify one.
    pub default_width: u32,
    /// Lossy encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    pub format: ShrunkFormat,
}

impl Default for ShrinkSettings {
    fn default() -> Self {
        Self {
            default_width: 1280,
            quality: 80,
            format: ShrunkFormat::Webp,
        }
    }
}

/// Settings for rewriting stored originals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OriginalsSettings {
    /// Quality used when a rotation re-encodes a lossy original, and for
    /// lossy upscaled copies.
    pub quality: u32,
}

impl Default for OriginalsSettings {
    fn default() -> Self {
        Self { quality: 95 }
    }
}

/// External upscaler invocation.
///
/// The tool is called as `<program> [<script>] -n <model> -i <in> -o <out>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpscalerConfig {
    pub program: String,
    /// When set, the upscaler is used only if this file exists; otherwise
    /// `program` must resolve on `PATH`. An empty string means no script.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    pub model: String,
}

impl UpscalerConfig {
    /// The configured script, treating an empty value as none.
    pub fn script_path(&self) -> Option<&str> {
        self.script.as_deref().filter(|s| !s.trim().is_empty())
    }
}

impl Default for UpscalerConfig {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            script: Some("inference_realesrgan.py".to_string()),
            model: "RealESRGAN_x4plus".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    /// URL prefix under which the storage root is served read-only.
    pub mount: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            mount: "view_storage".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist, `Err` if it exists but is
/// not valid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, merged over the stock defaults.
///
/// A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(path)?)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# simple-shrink configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Root of the artifact tree: <storage_root>/<YYYY-MM-DD>/{originals,shrunk,upscaled}/
storage_root = "storage"

# ---------------------------------------------------------------------------
# Shrinking
# ---------------------------------------------------------------------------
[shrink]
# Target width when a request does not name one. Height keeps the aspect ratio.
default_width = 1280

# Lossy quality of shrunk copies (1 = worst, 100 = best).
quality = 80

# Format of shrunk copies: "webp" or "jpeg".
format = "webp"

# ---------------------------------------------------------------------------
# Originals
# ---------------------------------------------------------------------------
[originals]
# Quality used when rotating rewrites a lossy original in place, and for
# lossy upscaled copies.
quality = 95

# ---------------------------------------------------------------------------
# AI upscaler
# ---------------------------------------------------------------------------
# Invoked as: <program> [<script>] -n <model> -i <input> -o <output>
# When the script (or, without a script, the program) cannot be found, images
# are re-encoded at their own size with cubic interpolation instead.
# Set script = "" to run a standalone binary found on PATH, e.g.
#   program = "realesrgan-ncnn-vulkan"
#   script = ""
[upscaler]
program = "python"
script = "inference_realesrgan.py"
model = "RealESRGAN_x4plus"

# ---------------------------------------------------------------------------
# HTTP server
# ---------------------------------------------------------------------------
[server]
bind = "127.0.0.1:8000"

# Storage is served read-only under /<mount>/
mount = "view_storage"
"##
}
