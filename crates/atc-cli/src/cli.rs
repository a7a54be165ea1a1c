//! Command-line arguments for `atc`.

use std::path::PathBuf;

use atc_build::ProfileName;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "atc",
    version,
    about = "Provision speech models and build the ATC game for the web",
    long_about = "Provision the speech-recognition model from its git-lfs submodule\n\
                  and drive the WASM release build, output assembly and dev-server\n\
                  configuration for the ATC game."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Pipeline config file; a relative path resolves against --project-root
    /// (default: <PROJECT_ROOT>/atc-pipeline.toml if present).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Project root holding the game workspace (default: current directory).
    #[arg(long = "project-root", value_name = "DIR", global = true)]
    pub project_root: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Make sure the speech model is present, then build the game natively.
    ///
    /// Safe to run repeatedly: the model is only downloaded when it is
    /// missing or invalid. A missing models submodule is reported but does
    /// not fail the command.
    Setup(SetupArgs),

    /// Pull the latest models and commit the new submodule pointer.
    ///
    /// Requires a previous `setup`. Creates at most one commit, and only when
    /// the pinned revision actually changed.
    Update,

    /// Build the web release, assemble the output and write the bridge config.
    Build(BuildArgs),

    /// Copy assets and public files into the output directory.
    Assemble,

    /// Write the dev-server bridge config.
    Bridge,

    /// List the available build profiles.
    Profiles,

    /// Show model state and output layout.
    Status,
}

#[derive(Args)]
pub struct SetupArgs {
    /// Skip the native build after provisioning.
    #[arg(long = "no-build")]
    pub no_build: bool,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Build profile (default: from config, else `release`).
    #[arg(long = "profile", value_name = "PROFILE")]
    pub profile: Option<ProfileName>,

    /// Stop after the release build; skip assembly and bridge config.
    #[arg(long = "no-assemble")]
    pub no_assemble: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
