//! Configuration handed to the front-end dev server.
//!
//! The dev server lives in its own project and only reads the assembled
//! output. It needs two things: permission to read the assets directory,
//! which sits outside its project root, and a static-copy rule that stages
//! those assets under a named subdirectory of its own build.

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::BridgeError;

/// Copies files matching `src` into `dest` of the dev server's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticCopyTarget {
    pub src: String,
    pub dest: String,
}

/// The dev server's view of the assembled output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevServerBridge {
    /// Filesystem paths outside the dev server root it may read.
    pub allow: Vec<String>,
    pub static_copy: Vec<StaticCopyTarget>,
}

impl DevServerBridge {
    /// Bridge exposing `assets_dir` as `dest` in the dev server's output.
    pub fn for_assets(assets_dir: &Path, dest: &str) -> Self {
        let assets = slash_path(assets_dir);
        Self {
            allow: vec![assets.clone()],
            static_copy: vec![StaticCopyTarget {
                src: format!("{assets}/*"),
                dest: dest.to_string(),
            }],
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, BridgeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the bridge file, creating parent directories as needed.
    pub fn write(&self, path: &Path) -> Result<(), BridgeError> {
        let mut json = self.to_json_pretty()?;
        json.push('\n');
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| BridgeError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, json).map_err(|source| BridgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "wrote dev-server bridge config");
        Ok(())
    }
}

/// Renders a path with forward slashes, as front-end tooling expects.
fn slash_path(path: &Path) -> String {
    let mut rendered = String::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => {
                rendered.push_str(&prefix.as_os_str().to_string_lossy());
            }
            Component::RootDir => rendered.push('/'),
            Component::CurDir => {}
            Component::ParentDir | Component::Normal(_) => {
                if !rendered.is_empty() && !rendered.ends_with('/') {
                    rendered.push('/');
                }
                rendered.push_str(&component.as_os_str().to_string_lossy());
            }
        }
    }
    rendered
}
