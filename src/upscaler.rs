//! Upscaling capability.
//!
//! An [`Upscaler`] turns an input image into an enhanced output image. Two
//! implementations ship:
//!
//! - [`ExternalUpscaler`] runs an AI upscaler as a child process using the
//!   command-line contract `<tool> -n <model> -i <input> -o <output>`. It is
//!   available only when its script (or program) can be found.
//! - [`CubicUpscaler`] re-encodes the input at its own size with cubic
//!   interpolation. It is always available, so a request can be answered even
//!   on machines without the AI tool.
//!
//! The pipeline asks each configured upscaler in order and uses the first
//! available one.
//!
//! The child process blocks the calling thread until it exits. There is no
//! timeout.

use crate::config::UpscalerConfig;
use crate::imaging::{BackendError, ImageBackend, Quality, cubic_reencode};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use thiserror::Error;

/// How much of a failing tool's stderr is kept in the error.
const STDERR_TAIL_BYTES: usize = 2000;

#[derive(Error, Debug)]
pub enum UpscaleError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("{program} exited successfully but wrote no output at {}", .path.display())]
    MissingOutput { program: String, path: PathBuf },
    #[error("cubic upscale failed: {0}")]
    Imaging(#[from] BackendError),
}

/// Something that can enhance an image file into another file.
pub trait Upscaler: Send + Sync {
    /// Short name for logs and reports.
    fn name(&self) -> &str;

    /// Whether this upscaler can run right now.
    fn is_available(&self) -> bool {
        true
    }

    /// Write an enhanced version of `input` to `output`.
    fn enhance(&self, input: &Path, output: &Path) -> Result<(), UpscaleError>;
}

/// AI upscaler invoked as a child process.
#[derive(Debug, Clone)]
pub struct ExternalUpscaler {
    program: PathBuf,
    script: Option<PathBuf>,
    model: String,
}

impl ExternalUpscaler {
    pub fn new(
        program: impl Into<PathBuf>,
        script: Option<PathBuf>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            script,
            model: model.into(),
        }
    }

    pub fn from_config(config: &UpscalerConfig) -> Self {
        Self::new(
            &config.program,
            config.script_path().map(PathBuf::from),
            &config.model,
        )
    }

    /// Arguments passed to the program, script first when one is configured.
    pub fn args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(7);
        if let Some(script) = &self.script {
            args.push(script.clone().into_os_string());
        }
        args.extend([
            OsString::from("-n"),
            OsString::from(&self.model),
            OsString::from("-i"),
            input.as_os_str().to_owned(),
            OsString::from("-o"),
            output.as_os_str().to_owned(),
        ]);
        args
    }

    fn program_label(&self) -> String {
        match &self.script {
            Some(script) => format!("{} {}", self.program.display(), script.display()),
            None => self.program.display().to_string(),
        }
    }
}

impl Upscaler for ExternalUpscaler {
    fn name(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        match &self.script {
            Some(script) => script.is_file(),
            None => program_resolves(&self.program),
        }
    }

    fn enhance(&self, input: &Path, output: &Path) -> Result<(), UpscaleError> {
        let program = self.program_label();
        tracing::info!(
            %program,
            model = %self.model,
            input = %input.display(),
            "running external upscaler"
        );

        let result = Command::new(&self.program)
            .args(self.args(input, output))
            .output()
            .map_err(|source| UpscaleError::Spawn {
                program: program.clone(),
                source,
            })?;

        tracing::info!(%program, status = %result.status, "external upscaler exited");
        if !result.stdout.is_empty() {
            tracing::debug!(stdout = %String::from_utf8_lossy(&result.stdout), "upscaler output");
        }

        if !result.status.success() {
            return Err(UpscaleError::Failed {
                program,
                status: result.status.to_string(),
                stderr: stderr_tail(&result.stderr),
            });
        }
        if !output.is_file() {
            return Err(UpscaleError::MissingOutput {
                program,
                path: output.to_path_buf(),
            });
        }
        Ok(())
    }
}

/// Fallback that only re-encodes with cubic interpolation at the input's
/// own dimensions. No detail is added.
pub struct CubicUpscaler {
    backend: Arc<dyn ImageBackend>,
    quality: Quality,
}

impl CubicUpscaler {
    pub fn new(backend: Arc<dyn ImageBackend>, quality: Quality) -> Self {
        Self { backend, quality }
    }
}

impl Upscaler for CubicUpscaler {
    fn name(&self) -> &str {
        "cubic"
    }

    fn enhance(&self, input: &Path, output: &Path) -> Result<(), UpscaleError> {
        cubic_reencode(self.backend.as_ref(), input, output, self.quality)?;
        Ok(())
    }
}

/// Upscalers in preference order: the configured external tool, then the
/// cubic fallback.
pub fn default_chain(
    config: &UpscalerConfig,
    backend: Arc<dyn ImageBackend>,
    quality: Quality,
) -> Vec<Arc<dyn Upscaler>> {
    vec![
        Arc::new(ExternalUpscaler::from_config(config)),
        Arc::new(CubicUpscaler::new(backend, quality)),
    ]
}

/// Whether `program` names an existing file, directly or via `PATH`.
fn program_resolves(program: &Path) -> bool {
    if program.components().count() > 1 {
        return program.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

/// Last few KB of stderr, trimmed, lossily decoded.
fn stderr_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim().to_string()
}
