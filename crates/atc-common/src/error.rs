use std::time::Duration;

/// Errors raised while running an external tool.
///
/// A tool that runs and exits non-zero is not a `ProcessError`; see
/// [`crate::CommandOutput::is_success`].
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting on `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` timed out after {}s", .timeout.as_secs_f64())]
    TimedOut { program: String, timeout: Duration },
}

impl ProcessError {
    /// Returns true when the tool itself could not be found on `PATH`.
    #[must_use]
    pub fn is_not_installed(&self) -> bool {
        matches!(
            self,
            Self::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
