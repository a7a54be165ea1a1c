//! Model artifact provisioning for the ATC game.
//!
//! The speech-recognition model lives in a git submodule whose large files are
//! tracked with git-lfs. This crate decides when that artifact has to be
//! downloaded, fetches it sparsely, and keeps the submodule pointer in the main
//! project in sync.
//!
//! # Overview
//!
//! - [`ArtifactStore`]: the large-file backend (`git` + `git lfs`).
//! - [`ProjectRepository`]: the main project's index (stage/commit).
//! - [`ArtifactValidator`]: pluggable validity check, presence by default.
//! - [`ModelProvisioner`]: the `setup` and `update` entry points.

#![deny(unsafe_code)]

pub mod artifact;
pub mod checksum;
pub mod error;
pub mod project;
pub mod provisioner;
pub mod store;

pub use artifact::{
    ArtifactRef, ArtifactState, ArtifactValidator, PresenceValidator, Sha256Validator,
    check_artifact,
};
pub use error::{FetchError, ProvisionError, RepositoryError};
pub use project::{GitProject, ProjectRepository};
pub use provisioner::{DEFAULT_COMMIT_MESSAGE, ModelProvisioner, SetupOutcome, UpdateOutcome};
pub use store::{ArtifactStore, GitLfsStore, RemoteRef, StoreTimeouts};

/// Default artifact path inside the models submodule.
pub const DEFAULT_ARTIFACT: &str = "whisper-small.en-atc-experiment/whisper-atc-q8_0.bin";

/// Default location of the models submodule relative to the project root.
pub const DEFAULT_MODELS_DIR: &str = "crates/atc_recognition_rs/resources/models";
