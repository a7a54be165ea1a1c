//! Web build for the ATC game.
//!
//! - [`builder`]: compile for `wasm32` and generate browser bindings
//! - [`assemble`]: copy build outputs, assets and public files into one directory
//! - [`bridge`]: configuration consumed by the front-end dev server
//! - [`pipeline`]: the three steps above in order

#![deny(unsafe_code)]

pub mod assemble;
pub mod bridge;
pub mod builder;
pub mod error;
pub mod pipeline;
pub mod profile;

pub use assemble::{AssemblyLayout, AssemblyReport, OutputAssembler};
pub use bridge::{DevServerBridge, StaticCopyTarget};
pub use builder::{BuildOutputSet, BuildSettings, ReleaseBuilder};
pub use error::{AssembleError, BridgeError, BuildError, PipelineError};
pub use pipeline::{BridgeTarget, PipelineReport, WebPipeline};
pub use profile::{BuildProfile, LtoMode, OptLevel, ProfileName, WASM_TARGET};
