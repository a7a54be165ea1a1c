//! `atc`: model provisioning and web release builds for the ATC game.

use std::io::{self, IsTerminal};

use atc_cli::logging::{LogConfig, LogFormat, init_logging};
use clap::{ColorChoice, Parser};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{
    Workspace, run_assemble, run_bridge, run_build, run_setup, run_status, run_update,
};
use crate::summary::{
    print_assembly, print_bridge, print_build, print_setup, print_update, profiles_table,
    status_table,
};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(&cli) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let workspace = Workspace::load(cli.project_root.as_deref(), cli.config.as_deref())?;
    match &cli.command {
        Command::Setup(args) => print_setup(&run_setup(&workspace, args)?),
        Command::Update => print_update(&run_update(&workspace)?),
        Command::Build(args) => print_build(&run_build(&workspace, args)?),
        Command::Assemble => print_assembly(&run_assemble(&workspace)?),
        Command::Bridge => print_bridge(&run_bridge(&workspace)?),
        Command::Status => println!("{}", status_table(&run_status(&workspace)?)),
        Command::Profiles => println!("{}", profiles_table(workspace.config.build.profile)),
    }
    Ok(())
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
