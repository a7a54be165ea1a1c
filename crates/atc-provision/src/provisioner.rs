//! Setup and update entry points for the model artifact.
//!
//! Setup is idempotent: a valid local artifact short-circuits the fetch, so
//! repeated runs never re-download a multi-hundred-megabyte file. Update always
//! pulls and re-fetches, then commits the advanced submodule pointer only when
//! the index actually changed.

use std::fmt;
use std::path::PathBuf;

use tracing::{info, info_span, warn};

use crate::artifact::{ArtifactRef, ArtifactState};
use crate::error::{FetchError, ProvisionError};
use crate::project::ProjectRepository;
use crate::store::{ArtifactStore, RemoteRef};

/// Commit message recorded when the pinned models reference advances.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Update models submodule";

/// Result of [`ModelProvisioner::setup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    /// The models directory is absent or empty; the submodule was never initialized.
    SubmoduleMissing { models_dir: PathBuf },
    /// The artifact was already valid; nothing was fetched.
    AlreadyProvisioned,
    /// The artifact was fetched.
    Fetched { previous: ArtifactState },
}

impl SetupOutcome {
    /// Whether model-dependent features will be unavailable.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::SubmoduleMissing { .. })
    }
}

impl fmt::Display for SetupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubmoduleMissing { models_dir } => write!(
                f,
                "models submodule not initialized at {}; speech recognition will be unavailable",
                models_dir.display()
            ),
            Self::AlreadyProvisioned => f.write_str("model already present, nothing to fetch"),
            Self::Fetched { previous } => write!(f, "model fetched (was {previous})"),
        }
    }
}

/// Result of [`ModelProvisioner::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Nothing changed in the main project; no commit was created.
    NoUpdates,
    /// The pinned reference advanced and was committed.
    Committed { commit: String },
}

impl UpdateOutcome {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::NoUpdates)
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoUpdates => f.write_str("no updates available"),
            Self::Committed { commit } => write!(f, "models updated in commit {commit}"),
        }
    }
}

/// Keeps the model artifact usable and the submodule pointer current.
pub struct ModelProvisioner<S, P> {
    store: S,
    project: P,
    artifact: ArtifactRef,
    remote: RemoteRef,
    commit_message: String,
}

impl<S: ArtifactStore, P: ProjectRepository> ModelProvisioner<S, P> {
    pub fn new(store: S, project: P, artifact: ArtifactRef, remote: RemoteRef) -> Self {
        Self {
            store,
            project,
            artifact,
            remote,
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
        }
    }

    #[must_use]
    pub fn with_commit_message(mut self, message: impl Into<String>) -> Self {
        self.commit_message = message.into();
        self
    }

    pub fn artifact(&self) -> &ArtifactRef {
        &self.artifact
    }

    /// Current local state of the artifact, or `None` without a submodule checkout.
    pub fn status(&self) -> Option<ArtifactState> {
        self.artifact
            .is_checked_out()
            .then(|| self.store.check(&self.artifact))
    }

    /// First-time provisioning.
    ///
    /// A missing or uninitialized models submodule is reported as
    /// [`SetupOutcome::SubmoduleMissing`], not as an error.
    pub fn setup(&self) -> Result<SetupOutcome, ProvisionError> {
        let span = info_span!("setup", artifact = %self.artifact.name());
        let _guard = span.enter();

        let models_dir = &self.artifact.models_dir;
        if !self.artifact.is_checked_out() {
            warn!(
                models_dir = %models_dir.display(),
                "models submodule not initialized, skipping model download"
            );
            return Ok(SetupOutcome::SubmoduleMissing {
                models_dir: models_dir.clone(),
            });
        }

        let previous = self.store.check(&self.artifact);
        if !previous.needs_fetch() {
            info!(artifact = %self.artifact, "model already present");
            return Ok(SetupOutcome::AlreadyProvisioned);
        }

        info!(artifact = %self.artifact, state = %previous, "model needs download");
        self.fetch_and_confirm()?;
        Ok(SetupOutcome::Fetched { previous })
    }

    /// Pulls upstream, re-fetches the artifact and commits the new pointer.
    ///
    /// The fetched artifact is re-checked with the configured validator. A
    /// pinned checksum must therefore be bumped together with the upstream
    /// model; otherwise the check fails, nothing is staged, and the submodule
    /// checkout is left at the new upstream revision for inspection.
    pub fn update(&self) -> Result<UpdateOutcome, ProvisionError> {
        let span = info_span!("update", artifact = %self.artifact.name(), remote = %self.remote);
        let _guard = span.enter();

        let models_dir = &self.artifact.models_dir;
        if !self.artifact.is_checked_out() {
            return Err(ProvisionError::MissingPrerequisite {
                path: models_dir.clone(),
                remediation: "models submodule not initialized; run `git submodule update --init` and `atc setup` first".to_string(),
            });
        }

        let pulled = self.store.pull_latest(models_dir, &self.remote)?;
        info!(pulled, "pulled models repository");
        self.fetch_and_confirm()?;

        self.project.stage(models_dir)?;
        if !self.project.has_staged_changes(models_dir)? {
            info!("no updates available");
            return Ok(UpdateOutcome::NoUpdates);
        }

        let commit = self.project.commit(models_dir, &self.commit_message)?;
        info!(%commit, "models submodule updated");
        Ok(UpdateOutcome::Committed { commit })
    }

    fn fetch_and_confirm(&self) -> Result<(), FetchError> {
        self.store.fetch(&self.artifact)?;
        match self.store.check(&self.artifact) {
            ArtifactState::Valid => Ok(()),
            state => Err(FetchError::MissingObject {
                artifact: self.artifact.include_pattern(),
                message: format!("artifact is {state} after fetch"),
            }),
        }
    }
}
