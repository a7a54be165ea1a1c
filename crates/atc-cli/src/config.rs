//! Pipeline configuration loaded from `atc-pipeline.toml`.
//!
//! Every field has a default, so the file is optional and may list only the
//! values that differ. Relative paths are resolved against the project root.

use std::path::{Path, PathBuf};
use std::time::Duration;

use atc_build::{AssemblyLayout, BridgeTarget, BuildSettings, ProfileName};
use atc_provision::checksum::normalize_digest;
use atc_provision::{
    ArtifactRef, ArtifactValidator, DEFAULT_ARTIFACT, DEFAULT_COMMIT_MESSAGE, DEFAULT_MODELS_DIR,
    PresenceValidator, RemoteRef, Sha256Validator, StoreTimeouts,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File looked up in the project root when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "atc-pipeline.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {} does not exist", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid sha256 digest '{value}' in [models]: expected 64 hex characters")]
    InvalidDigest { value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub models: ModelsConfig,
    pub build: BuildConfig,
    pub assemble: AssembleConfig,
    pub bridge: BridgeConfig,
}

/// `[models]`: where the model lives and how it is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelsConfig {
    /// Submodule checkout holding the models.
    pub dir: PathBuf,
    /// Artifact path inside `dir`.
    pub artifact: PathBuf,
    pub remote: String,
    pub branch: String,
    /// Expected digest; when set, the artifact is validated by checksum.
    ///
    /// `atc update` re-checks the pulled model against this digest, so bump it
    /// in the same change that moves the submodule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_timeout_secs: Option<u64>,
    pub commit_message: String,
    pub git: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_MODELS_DIR),
            artifact: PathBuf::from(DEFAULT_ARTIFACT),
            remote: "origin".to_string(),
            branch: "main".to_string(),
            sha256: None,
            fetch_timeout_secs: None,
            pull_timeout_secs: None,
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            git: "git".to_string(),
        }
    }
}

/// `[build]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    pub binary: String,
    pub profile: ProfileName,
    pub out_dir: PathBuf,
    pub out_name: String,
    pub cargo: String,
    pub wasm_bindgen: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_dir: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            package: None,
            binary: "atc-game".to_string(),
            profile: ProfileName::default(),
            out_dir: PathBuf::from("out"),
            out_name: "atc_game".to_string(),
            cargo: "cargo".to_string(),
            wasm_bindgen: "wasm-bindgen".to_string(),
            target_dir: None,
        }
    }
}

/// `[assemble]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssembleConfig {
    pub assets_dir: PathBuf,
    pub public_dir: PathBuf,
}

impl Default for AssembleConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            public_dir: PathBuf::from("public"),
        }
    }
}

/// `[bridge]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Where the dev-server bridge JSON is written.
    pub config_path: PathBuf,
    /// Subdirectory of the dev server's output that receives the assets.
    pub dest: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("web/atc-bridge.json"),
            dest: "game".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Loads the config for `root`.
    ///
    /// An explicit path must exist. Without one, `<root>/atc-pipeline.toml`
    /// is read if present and defaults are used otherwise.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => {
                let path = resolve(root, path);
                if !path.is_file() {
                    return Err(ConfigError::NotFound { path });
                }
                path
            }
            None => {
                let path = root.join(CONFIG_FILE_NAME);
                if !path.is_file() {
                    tracing::debug!(root = %root.display(), "no config file, using defaults");
                    return Ok(Self::default());
                }
                path
            }
        };
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(digest) = &self.models.sha256
            && normalize_digest(digest).is_none()
        {
            return Err(ConfigError::InvalidDigest {
                value: digest.clone(),
            });
        }
        Ok(())
    }
}

impl ModelsConfig {
    pub fn artifact_ref(&self, root: &Path) -> ArtifactRef {
        ArtifactRef::new(resolve(root, &self.dir), self.artifact.clone())
    }

    pub fn remote_ref(&self) -> RemoteRef {
        RemoteRef::new(&self.remote, &self.branch)
    }

    pub fn timeouts(&self) -> StoreTimeouts {
        StoreTimeouts {
            fetch: self.fetch_timeout_secs.map(Duration::from_secs),
            pull: self.pull_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Checksum validator when a digest is configured, presence otherwise.
    pub fn validator(&self) -> Result<Box<dyn ArtifactValidator>, ConfigError> {
        match &self.sha256 {
            Some(digest) => Sha256Validator::new(digest)
                .map(|validator| Box::new(validator) as Box<dyn ArtifactValidator>)
                .ok_or_else(|| ConfigError::InvalidDigest {
                    value: digest.clone(),
                }),
            None => Ok(Box::new(PresenceValidator)),
        }
    }
}

impl BuildConfig {
    pub fn settings(&self, root: &Path) -> BuildSettings {
        let mut settings = BuildSettings::new(root);
        settings.package = self.package.clone();
        settings.binary = self.binary.clone();
        settings.target_dir = self.target_dir.as_deref().map(|dir| resolve(root, dir));
        settings.out_dir = resolve(root, &self.out_dir);
        settings.out_name = self.out_name.clone();
        settings.cargo = self.cargo.clone().into();
        settings.wasm_bindgen = self.wasm_bindgen.clone().into();
        settings
    }
}

impl PipelineConfig {
    pub fn layout(&self, root: &Path) -> AssemblyLayout {
        AssemblyLayout {
            out_dir: resolve(root, &self.build.out_dir),
            assets_dir: resolve(root, &self.assemble.assets_dir),
            public_dir: resolve(root, &self.assemble.public_dir),
        }
    }

    pub fn bridge_target(&self, root: &Path) -> BridgeTarget {
        BridgeTarget {
            config_path: resolve(root, &self.bridge.config_path),
            dest: self.bridge.dest.clone(),
        }
    }
}

/// `path` if absolute, otherwise `root/path`.
pub fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: PipelineConfig = toml::from_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.models.remote_ref().to_string(), "origin/main");
        assert_eq!(config.build.profile, ProfileName::Release);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [models]
            branch = "release"
            fetch_timeout_secs = 600

            [build]
            profile = "max"
            package = "atc-game"
            "#,
        )
        .unwrap();
        assert_eq!(config.models.remote, "origin");
        assert_eq!(config.models.branch, "release");
        assert_eq!(config.models.timeouts().fetch, Some(Duration::from_secs(600)));
        assert_eq!(config.models.timeouts().pull, None);
        assert_eq!(config.build.profile, ProfileName::Max);
        assert_eq!(config.build.binary, "atc-game");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = toml::from_str::<PipelineConfig>("[build]\nprofle = \"max\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_relative_paths_resolve_against_root() {
        let config = PipelineConfig::default();
        let root = Path::new("/work/atc");
        let layout = config.layout(root);
        assert_eq!(layout.out_dir, Path::new("/work/atc/out"));
        assert_eq!(layout.assets_dir, Path::new("/work/atc/assets"));
        assert_eq!(
            config.models.artifact_ref(root).models_dir,
            Path::new("/work/atc/crates/atc_recognition_rs/resources/models")
        );
        assert_eq!(
            config.bridge_target(Path::new("/work/atc")).config_path,
            Path::new("/work/atc/web/atc-bridge.json")
        );
    }

    #[test]
    fn test_absolute_out_dir_is_kept() {
        let mut config = PipelineConfig::default();
        config.build.out_dir = PathBuf::from("/srv/atc");
        let settings = config.build.settings(Path::new("/work/atc"));
        assert_eq!(settings.out_dir, Path::new("/srv/atc"));
        assert_eq!(settings.project_root, Path::new("/work/atc"));
    }

    #[test]
    fn test_invalid_digest_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[models]\nsha256 = \"abc\"\n").unwrap();

        let err = PipelineConfig::load(dir.path(), None).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidDigest { ref value } if value == "abc"));
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::load(dir.path(), Some(Path::new("custom.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }
}
