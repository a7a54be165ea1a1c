//! Artifact references and local validity checks.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::checksum::{compute_file_sha256, normalize_digest};

/// A large binary asset tracked inside the models submodule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    /// Checkout of the models submodule.
    pub models_dir: PathBuf,
    /// Path of the artifact relative to `models_dir`.
    pub relative_path: PathBuf,
}

impl ArtifactRef {
    pub fn new(models_dir: impl Into<PathBuf>, relative_path: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            relative_path: relative_path.into(),
        }
    }

    /// Full path of the artifact on disk.
    pub fn path(&self) -> PathBuf {
        self.models_dir.join(&self.relative_path)
    }

    /// Artifact name as the large-file backend expects it (forward slashes).
    pub fn include_pattern(&self) -> String {
        self.relative_path
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Whether the models submodule is checked out.
    ///
    /// An uninitialized submodule is an empty directory, and git run inside it
    /// resolves the enclosing project instead. Only a `.git` entry (a gitfile
    /// for submodules, a directory for plain clones) marks a real checkout.
    pub fn is_checked_out(&self) -> bool {
        self.models_dir.join(".git").exists()
    }

    /// File name of the artifact, used in log lines.
    pub fn name(&self) -> String {
        self.relative_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.include_pattern())
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

/// Local state of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    /// No file at the expected path.
    Missing,
    /// A file exists but the validator rejected it.
    Invalid,
    /// The file exists and the validator accepted it.
    Valid,
}

impl ArtifactState {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Invalid => "invalid",
            Self::Valid => "valid",
        }
    }

    #[must_use]
    pub const fn needs_fetch(&self) -> bool {
        !matches!(self, Self::Valid)
    }
}

impl fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decides whether an existing artifact file is usable.
pub trait ArtifactValidator {
    fn validate(&self, path: &Path) -> bool;

    /// Short name shown in logs and status output.
    fn describe(&self) -> String;
}

/// Accepts any non-empty file.
///
/// Content is never inspected; an LFS pointer file that was not smudged
/// passes this check.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceValidator;

impl ArtifactValidator for PresenceValidator {
    fn validate(&self, path: &Path) -> bool {
        match std::fs::metadata(path) {
            Ok(metadata) => metadata.is_file() && metadata.len() > 0,
            Err(_) => false,
        }
    }

    fn describe(&self) -> String {
        "presence (non-empty file)".to_string()
    }
}

/// Accepts a non-empty file whose SHA256 matches a pinned digest.
#[derive(Debug, Clone)]
pub struct Sha256Validator {
    expected: String,
}

impl Sha256Validator {
    /// Returns `None` if `digest` is not a valid SHA256 hex digest.
    pub fn new(digest: &str) -> Option<Self> {
        normalize_digest(digest).map(|expected| Self { expected })
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }
}

impl ArtifactValidator for Sha256Validator {
    fn validate(&self, path: &Path) -> bool {
        if !PresenceValidator.validate(path) {
            return false;
        }
        match compute_file_sha256(path) {
            Ok(actual) if actual == self.expected => true,
            Ok(actual) => {
                warn!(
                    path = %path.display(),
                    expected = %self.expected,
                    actual = %actual,
                    "artifact checksum mismatch"
                );
                false
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "could not hash artifact");
                false
            }
        }
    }

    fn describe(&self) -> String {
        format!("sha256 {}", self.expected)
    }
}

/// Computes the tri-state precondition for an artifact.
pub fn check_artifact(artifact: &ArtifactRef, validator: &dyn ArtifactValidator) -> ArtifactState {
    let path = artifact.path();
    let state = if !path.is_file() {
        ArtifactState::Missing
    } else if validator.validate(&path) {
        ArtifactState::Valid
    } else {
        ArtifactState::Invalid
    };
    debug!(
        artifact = %path.display(),
        validator = %validator.describe(),
        state = %state,
        "checked artifact"
    );
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA256: &str = "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f";

    fn artifact_in(dir: &Path) -> ArtifactRef {
        ArtifactRef::new(dir, "whisper-small.en-atc-experiment/whisper-atc-q8_0.bin")
    }

    fn write_artifact(artifact: &ArtifactRef, contents: &[u8]) {
        let path = artifact.path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_include_pattern_uses_forward_slashes() {
        let artifact = ArtifactRef::new("/models", Path::new("nested").join("model.bin"));
        assert_eq!(artifact.include_pattern(), "nested/model.bin");
        assert_eq!(artifact.name(), "model.bin");
    }

    #[test]
    fn test_missing_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = artifact_in(dir.path());
        assert_eq!(
            check_artifact(&artifact, &PresenceValidator),
            ArtifactState::Missing
        );
    }

    #[test]
    fn test_empty_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = artifact_in(dir.path());
        write_artifact(&artifact, b"");
        assert_eq!(
            check_artifact(&artifact, &PresenceValidator),
            ArtifactState::Invalid
        );
    }

    #[test]
    fn test_non_empty_file_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = artifact_in(dir.path());
        write_artifact(&artifact, b"ggml");
        assert_eq!(
            check_artifact(&artifact, &PresenceValidator),
            ArtifactState::Valid
        );
        assert!(!ArtifactState::Valid.needs_fetch());
    }

    #[test]
    fn test_directory_at_artifact_path_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = artifact_in(dir.path());
        std::fs::create_dir_all(artifact.path()).unwrap();
        assert_eq!(
            check_artifact(&artifact, &PresenceValidator),
            ArtifactState::Missing
        );
    }

    #[test]
    fn test_sha256_validator() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = artifact_in(dir.path());
        write_artifact(&artifact, b"Hello, World!");

        let matching = Sha256Validator::new(&format!("sha256:{HELLO_SHA256}")).unwrap();
        assert_eq!(check_artifact(&artifact, &matching), ArtifactState::Valid);

        let other = Sha256Validator::new(&"0".repeat(64)).unwrap();
        assert_eq!(check_artifact(&artifact, &other), ArtifactState::Invalid);
    }

    #[test]
    fn test_sha256_validator_rejects_malformed_digest() {
        assert!(Sha256Validator::new("not-a-digest").is_none());
    }
}
