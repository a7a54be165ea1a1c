//! Artifact store adapter over git and git-lfs.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use atc_common::{CommandOutput, CommandRunner, CommandSpec};
use tracing::{debug, info};

use crate::artifact::{ArtifactRef, ArtifactState, ArtifactValidator, check_artifact};
use crate::error::FetchError;

/// Upstream branch the models submodule follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    pub remote: String,
    pub branch: String,
}

impl RemoteRef {
    pub fn new(remote: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            branch: branch.into(),
        }
    }
}

impl Default for RemoteRef {
    fn default() -> Self {
        Self::new("origin", "main")
    }
}

impl fmt::Display for RemoteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.remote, self.branch)
    }
}

/// Large-file aware storage backing the models directory.
pub trait ArtifactStore {
    /// Tri-state precondition check for `artifact`.
    fn check(&self, artifact: &ArtifactRef) -> ArtifactState;

    /// Materializes exactly `artifact`, leaving other large files alone.
    fn fetch(&self, artifact: &ArtifactRef) -> Result<(), FetchError>;

    /// Merges upstream changes into `models_dir`; returns whether anything changed.
    fn pull_latest(&self, models_dir: &Path, remote: &RemoteRef) -> Result<bool, FetchError>;

    fn is_present_and_valid(&self, artifact: &ArtifactRef) -> bool {
        self.check(artifact) == ArtifactState::Valid
    }
}

impl<S: ArtifactStore + ?Sized> ArtifactStore for &S {
    fn check(&self, artifact: &ArtifactRef) -> ArtifactState {
        (**self).check(artifact)
    }

    fn fetch(&self, artifact: &ArtifactRef) -> Result<(), FetchError> {
        (**self).fetch(artifact)
    }

    fn pull_latest(&self, models_dir: &Path, remote: &RemoteRef) -> Result<bool, FetchError> {
        (**self).pull_latest(models_dir, remote)
    }
}

/// Timeouts for backend operations. `None` waits indefinitely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreTimeouts {
    pub fetch: Option<Duration>,
    pub pull: Option<Duration>,
}

/// [`ArtifactStore`] backed by `git` and `git lfs`.
pub struct GitLfsStore<R> {
    runner: R,
    validator: Box<dyn ArtifactValidator>,
    git: OsString,
    timeouts: StoreTimeouts,
}

impl<R: CommandRunner> GitLfsStore<R> {
    pub fn new(runner: R, validator: Box<dyn ArtifactValidator>) -> Self {
        Self {
            runner,
            validator,
            git: OsString::from("git"),
            timeouts: StoreTimeouts::default(),
        }
    }

    #[must_use]
    pub fn with_git(mut self, git: impl Into<OsString>) -> Self {
        self.git = git.into();
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: StoreTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn validator(&self) -> &dyn ArtifactValidator {
        self.validator.as_ref()
    }

    fn git(&self, cwd: &Path) -> CommandSpec {
        CommandSpec::new(&self.git, cwd)
    }

    fn head(&self, models_dir: &Path, operation: &str) -> Result<String, FetchError> {
        let spec = self.git(models_dir).args(["rev-parse", "HEAD"]);
        let output = self
            .runner
            .run(&spec)
            .map_err(|source| FetchError::from_process(operation, source))?;
        if !output.is_success() {
            return Err(FetchError::Backend {
                operation: operation.to_string(),
                message: output.diagnostic(),
            });
        }
        Ok(output.stdout.trim().to_string())
    }
}

impl<R: CommandRunner> ArtifactStore for GitLfsStore<R> {
    fn check(&self, artifact: &ArtifactRef) -> ArtifactState {
        check_artifact(artifact, self.validator.as_ref())
    }

    fn fetch(&self, artifact: &ArtifactRef) -> Result<(), FetchError> {
        let operation = "git lfs pull";
        let include = artifact.include_pattern();
        info!(artifact = %include, models_dir = %artifact.models_dir.display(), "fetching artifact");
        let spec = self
            .git(&artifact.models_dir)
            .args(["lfs", "pull", "--include"])
            .arg(&include)
            .timeout(self.timeouts.fetch);
        let output = self
            .runner
            .run(&spec)
            .map_err(|source| FetchError::from_process(operation, source))?;
        if !output.is_success() {
            return Err(classify_failure(operation, &include, &output));
        }
        debug!(artifact = %include, "artifact fetched");
        Ok(())
    }

    fn pull_latest(&self, models_dir: &Path, remote: &RemoteRef) -> Result<bool, FetchError> {
        let operation = "git pull";
        let before = self.head(models_dir, operation)?;
        info!(models_dir = %models_dir.display(), remote = %remote, "pulling models repository");
        let spec = self
            .git(models_dir)
            .arg("pull")
            .arg(&remote.remote)
            .arg(&remote.branch)
            .timeout(self.timeouts.pull);
        let output = self
            .runner
            .run(&spec)
            .map_err(|source| FetchError::from_process(operation, source))?;
        if !output.is_success() {
            return Err(classify_failure(operation, &remote.to_string(), &output));
        }
        let after = self.head(models_dir, operation)?;
        let changed = before != after;
        debug!(%before, %after, changed, "pull complete");
        Ok(changed)
    }
}

/// Maps backend stderr to a [`FetchError`] variant.
pub fn classify_failure(operation: &str, subject: &str, output: &CommandOutput) -> FetchError {
    let message = output.diagnostic();
    let lower = message.to_lowercase();
    let operation = operation.to_string();

    const AUTH: &[&str] = &[
        "authentication failed",
        "could not read username",
        "permission denied (publickey)",
        "http 401",
        "http 403",
        "invalid credentials",
    ];
    const MISSING: &[&str] = &[
        "object does not exist",
        "not found on the server",
        "couldn't find remote ref",
        "http 404",
        "404 not found",
        "no such object",
    ];
    const NETWORK: &[&str] = &[
        "could not resolve host",
        "unable to access",
        "connection refused",
        "connection timed out",
        "network is unreachable",
        "connection reset",
    ];

    if AUTH.iter().any(|needle| lower.contains(needle)) {
        FetchError::Auth { operation, message }
    } else if MISSING.iter().any(|needle| lower.contains(needle)) {
        FetchError::MissingObject {
            artifact: subject.to_string(),
            message,
        }
    } else if NETWORK.iter().any(|needle| lower.contains(needle)) {
        FetchError::Network { operation, message }
    } else {
        FetchError::Backend { operation, message }
    }
}
