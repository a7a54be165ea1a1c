//! Error types for the web build pipeline.

use std::path::PathBuf;

use atc_common::ProcessError;
use thiserror::Error;

/// Failures of the release build. Any of these aborts the pipeline.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The compiler exited non-zero.
    #[error("compilation for {target} failed (exit code {code:?}): {message}")]
    Compile {
        target: String,
        code: Option<i32>,
        message: String,
    },

    /// The compiler succeeded but the expected module is not on disk.
    #[error("compiled module not found at {}", .path.display())]
    MissingModule { path: PathBuf },

    /// The bindings generator exited non-zero.
    #[error("bindings generation failed (exit code {code:?}): {message}")]
    Bindings { code: Option<i32>, message: String },

    /// The bindings generator succeeded but an expected output is missing.
    #[error("bindings output not found at {}", .path.display())]
    MissingOutput { path: PathBuf },

    #[error("could not run {step}: {source}")]
    Process {
        step: &'static str,
        #[source]
        source: ProcessError,
    },

    #[error("failed to prepare {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Returns a short hint on how to fix the failure.
    #[must_use]
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::Compile { .. } => "Fix the compiler errors above and rebuild.",
            Self::MissingModule { .. } => {
                "Check the configured binary name and target directory."
            }
            Self::Bindings { .. } | Self::MissingOutput { .. } => {
                "Make sure the wasm-bindgen CLI version matches the wasm-bindgen crate version."
            }
            Self::Process { source, .. } if source.is_not_installed() => {
                "Install the missing tool (cargo, wasm-bindgen-cli) and make sure it is on PATH."
            }
            Self::Process { .. } | Self::Io { .. } => "Inspect the error above and retry.",
        }
    }
}

/// Failures while assembling the deployable directory.
///
/// There is no rollback: a failure leaves a partially assembled directory,
/// which the next run overwrites.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("source tree {} does not exist", .path.display())]
    MissingSource { path: PathBuf },

    #[error("failed to copy {} to {}: {source}", .src.display(), .dest.display())]
    Copy {
        src: PathBuf,
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AssembleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures while writing the dev-server bridge file.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to encode bridge config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of the combined build → assemble → bridge pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}
