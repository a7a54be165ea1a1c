//! Library side of the `atc` command: configuration and logging setup.

pub mod config;
pub mod logging;
