//! Cursor installer CLI.

use std::io::{self, IsTerminal};

use anyhow::Context;
use clap::{ColorChoice, Parser};
use cursor_install::{
    HttpTransport, InstallError, InstallReport, InstallerConfig, Orchestrator, SystemProbe,
};
use cursor_install_cli::logging::{LogConfig, LogFormat, init_logging};
use tracing::level_filters::LevelFilter;

mod cli;
mod summary;

use crate::cli::{Cli, LogFormatArg, LogLevelArg};
use crate::summary::print_summary;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(&log_config) {
        Ok(report) => {
            print_summary(&report);
            0
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            if let Some(install_error) = error.downcast_ref::<InstallError>() {
                eprintln!("{}", install_error.user_message());
            }
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(log_config: &LogConfig) -> anyhow::Result<InstallReport> {
    let config = InstallerConfig::default().with_progress(show_progress(log_config));
    let transport = HttpTransport::new(&config).context("failed to create HTTP client")?;
    let report = Orchestrator::new(&config, &transport, &SystemProbe).run()?;
    Ok(report)
}

/// Progress bars only make sense when a human is watching stderr.
fn show_progress(log_config: &LogConfig) -> bool {
    log_config.format != LogFormat::Json && io::stderr().is_terminal()
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
    config.with_timestamps = !config.writes_to_stderr();
    config.with_target = config.level_filter >= LevelFilter::DEBUG;
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => config.writes_to_stderr() && io::stderr().is_terminal(),
    };
    config
}
