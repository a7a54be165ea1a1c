//! Error types for model provisioning.

use std::path::PathBuf;
use std::time::Duration;

use atc_common::ProcessError;
use thiserror::Error;

/// Errors raised by the artifact store while talking to the large-file backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    /// The remote could not be reached.
    #[error("network error during {operation}: {message}")]
    Network { operation: String, message: String },

    /// The remote rejected our credentials.
    #[error("authentication failed during {operation}: {message}")]
    Auth { operation: String, message: String },

    /// The backend reported that the requested object does not exist.
    #[error("artifact {artifact} is missing on the remote: {message}")]
    MissingObject { artifact: String, message: String },

    /// Any other non-zero exit from the backend.
    #[error("{operation} failed: {message}")]
    Backend { operation: String, message: String },

    /// The operation exceeded its configured timeout.
    #[error("{operation} timed out after {}s", .timeout.as_secs())]
    TimedOut { operation: String, timeout: Duration },

    /// The backend tool could not be started.
    #[error("could not run {operation}: {source}")]
    Process {
        operation: String,
        #[source]
        source: ProcessError,
    },
}

impl FetchError {
    /// Maps a runner failure to a fetch error, keeping timeouts distinct.
    pub(crate) fn from_process(operation: impl Into<String>, source: ProcessError) -> Self {
        let operation = operation.into();
        match source {
            ProcessError::TimedOut { timeout, .. } => Self::TimedOut { operation, timeout },
            source => Self::Process { operation, source },
        }
    }

    /// Returns a short hint on how to fix the failure.
    #[must_use]
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::Network { .. } => "Check your network connection and retry.",
            Self::Auth { .. } => "Check your git credentials for the models repository.",
            Self::MissingObject { .. } => {
                "The pinned revision does not provide a valid artifact; if `[models] sha256` is set, \
                 update it to the new model's digest."
            }
            Self::TimedOut { .. } => "Retry, or raise the configured timeout.",
            Self::Process { source, .. } if source.is_not_installed() => {
                "Install git and git-lfs and make sure they are on PATH."
            }
            Self::Backend { .. } | Self::Process { .. } => "Inspect the git output above and retry.",
        }
    }

    /// Returns whether this error is potentially recoverable with a retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::TimedOut { .. })
    }
}

/// Errors raised while staging or committing in the main project.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("git {operation} failed: {message}")]
    Git { operation: String, message: String },

    #[error("could not run git {operation}: {source}")]
    Process {
        operation: String,
        #[source]
        source: ProcessError,
    },
}

/// Errors surfaced by [`crate::ModelProvisioner`].
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A precondition the operation depends on is not met.
    #[error("missing prerequisite {}: {remediation}", .path.display())]
    MissingPrerequisite {
        path: PathBuf,
        remediation: String,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ProvisionError {
    /// Returns a short hint on how to fix the failure.
    #[must_use]
    pub fn remediation(&self) -> &str {
        match self {
            Self::MissingPrerequisite { remediation, .. } => remediation,
            Self::Fetch(error) => error.remediation(),
            Self::Repository(_) => "Resolve the git error in the main project and retry.",
        }
    }
}
