//! Shared utilities for the ATC asset and build pipeline crates.

#![deny(unsafe_code)]

pub mod error;
pub mod process;

pub use error::ProcessError;
pub use process::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
