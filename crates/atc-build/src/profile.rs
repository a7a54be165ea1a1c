//! Build profiles for the WASM release build.
//!
//! Three flag sets have been used to ship the web build. `release` is the
//! canonical one; `minimal` and `max` stay available by name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Target triple every web profile compiles for.
pub const WASM_TARGET: &str = "wasm32-unknown-unknown";

/// Named build profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileName {
    /// Size-optimized.
    Minimal,
    /// Plain `--release`, no extra codegen flags.
    #[default]
    Release,
    /// Size-optimized with thin LTO and embedded bitcode.
    Max,
}

impl ProfileName {
    pub const ALL: [Self; 3] = [Self::Minimal, Self::Release, Self::Max];

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Release => "release",
            Self::Max => "max",
        }
    }

    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Minimal => "Size-optimized build (opt-level=z)",
            Self::Release => "Default release build",
            Self::Max => "Size-optimized build with thin LTO and embedded bitcode",
        }
    }

    #[must_use]
    pub const fn profile(self) -> BuildProfile {
        match self {
            Self::Minimal => BuildProfile {
                name: self,
                opt_level: Some(OptLevel::Z),
                lto: None,
                embed_bitcode: None,
            },
            Self::Release => BuildProfile {
                name: self,
                opt_level: None,
                lto: None,
                embed_bitcode: None,
            },
            Self::Max => BuildProfile {
                name: self,
                opt_level: Some(OptLevel::Z),
                lto: Some(LtoMode::Thin),
                embed_bitcode: Some(true),
            },
        }
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProfileName {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.label().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown build profile '{value}' (expected one of: minimal, release, max)"
                )
            })
    }
}

/// `-C opt-level` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptLevel {
    O2,
    O3,
    S,
    Z,
}

impl OptLevel {
    const fn flag(&self) -> &'static str {
        match self {
            Self::O2 => "2",
            Self::O3 => "3",
            Self::S => "s",
            Self::Z => "z",
        }
    }
}

/// `-C lto` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LtoMode {
    Off,
    Thin,
    Fat,
}

impl LtoMode {
    const fn flag(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Thin => "thin",
            Self::Fat => "fat",
        }
    }
}

/// An immutable set of codegen flags for one build invocation.
///
/// Unset options leave the compiler default in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildProfile {
    name: ProfileName,
    opt_level: Option<OptLevel>,
    lto: Option<LtoMode>,
    embed_bitcode: Option<bool>,
}

impl BuildProfile {
    pub const fn name(&self) -> ProfileName {
        self.name
    }

    pub const fn target(&self) -> &'static str {
        WASM_TARGET
    }

    pub const fn opt_level(&self) -> Option<OptLevel> {
        self.opt_level
    }

    pub const fn lto(&self) -> Option<LtoMode> {
        self.lto
    }

    pub const fn embed_bitcode(&self) -> Option<bool> {
        self.embed_bitcode
    }

    /// Codegen flags as passed through `RUSTFLAGS`.
    pub fn rustflags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if let Some(level) = self.opt_level {
            flags.push(format!("-C opt-level={}", level.flag()));
        }
        if let Some(lto) = self.lto {
            flags.push(format!("-C lto={}", lto.flag()));
        }
        if let Some(embed) = self.embed_bitcode {
            let value = if embed { "yes" } else { "no" };
            flags.push(format!("-C embed-bitcode={value}"));
        }
        flags
    }

    /// `RUSTFLAGS` value, or `None` when the profile adds no flags.
    pub fn rustflags_env(&self) -> Option<String> {
        let flags = self.rustflags();
        (!flags.is_empty()).then(|| flags.join(" "))
    }
}

impl Default for BuildProfile {
    fn default() -> Self {
        ProfileName::default().profile()
    }
}
