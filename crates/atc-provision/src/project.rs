//! The main project's version-control index.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use atc_common::{CommandOutput, CommandRunner, CommandSpec};
use tracing::{debug, info};

use crate::error::RepositoryError;

/// Staging and committing in the project that pins the models submodule.
pub trait ProjectRepository {
    fn stage(&self, path: &Path) -> Result<(), RepositoryError>;

    /// Whether the index holds changes for `path` relative to `HEAD`.
    fn has_staged_changes(&self, path: &Path) -> Result<bool, RepositoryError>;

    /// Commits only `path`; returns the new commit id.
    fn commit(&self, path: &Path, message: &str) -> Result<String, RepositoryError>;
}

impl<P: ProjectRepository + ?Sized> ProjectRepository for &P {
    fn stage(&self, path: &Path) -> Result<(), RepositoryError> {
        (**self).stage(path)
    }

    fn has_staged_changes(&self, path: &Path) -> Result<bool, RepositoryError> {
        (**self).has_staged_changes(path)
    }

    fn commit(&self, path: &Path, message: &str) -> Result<String, RepositoryError> {
        (**self).commit(path, message)
    }
}

/// [`ProjectRepository`] driving the `git` CLI at a fixed root.
pub struct GitProject<R> {
    runner: R,
    root: PathBuf,
    git: OsString,
}

impl<R: CommandRunner> GitProject<R> {
    pub fn new(runner: R, root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            root: root.into(),
            git: OsString::from("git"),
        }
    }

    #[must_use]
    pub fn with_git(mut self, git: impl Into<OsString>) -> Self {
        self.git = git.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path as git sees it from the project root.
    fn pathspec(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }

    fn run(&self, operation: &str, spec: &CommandSpec) -> Result<CommandOutput, RepositoryError> {
        self.runner
            .run(spec)
            .map_err(|source| RepositoryError::Process {
                operation: operation.to_string(),
                source,
            })
    }
}

impl<R: CommandRunner> ProjectRepository for GitProject<R> {
    fn stage(&self, path: &Path) -> Result<(), RepositoryError> {
        let pathspec = self.pathspec(path);
        let spec = CommandSpec::new(&self.git, &self.root)
            .arg("add")
            .arg("--")
            .arg(&pathspec);
        let output = self.run("add", &spec)?;
        if !output.is_success() {
            return Err(RepositoryError::Git {
                operation: "add".to_string(),
                message: output.diagnostic(),
            });
        }
        debug!(path = %pathspec.display(), "staged");
        Ok(())
    }

    fn has_staged_changes(&self, path: &Path) -> Result<bool, RepositoryError> {
        let spec = CommandSpec::new(&self.git, &self.root)
            .args(["diff", "--cached", "--quiet", "--"])
            .arg(self.pathspec(path));
        let output = self.run("diff --cached", &spec)?;
        // --quiet exits 1 when there are differences and 0 when there are none.
        match output.code {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(RepositoryError::Git {
                operation: "diff --cached".to_string(),
                message: output.diagnostic(),
            }),
        }
    }

    fn commit(&self, path: &Path, message: &str) -> Result<String, RepositoryError> {
        let pathspec = self.pathspec(path);
        let spec = CommandSpec::new(&self.git, &self.root)
            .args(["commit", "-m", message, "--"])
            .arg(&pathspec);
        let output = self.run("commit", &spec)?;
        if !output.is_success() {
            return Err(RepositoryError::Git {
                operation: "commit".to_string(),
                message: output.diagnostic(),
            });
        }

        let spec = CommandSpec::new(&self.git, &self.root).args(["rev-parse", "HEAD"]);
        let output = self.run("rev-parse", &spec)?;
        if !output.is_success() {
            return Err(RepositoryError::Git {
                operation: "rev-parse".to_string(),
                message: output.diagnostic(),
            });
        }
        let commit = output.stdout.trim().to_string();
        info!(%commit, path = %pathspec.display(), "committed pinned reference");
        Ok(commit)
    }
}
