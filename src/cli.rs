// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `batchdag`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "batchdag",
    version,
    about = "Run a dependency graph of jobs locally or on an LSF cluster.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Batchdag.toml` in the current working directory if it
    /// exists, otherwise built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run every job as a local subprocess instead of submitting to LSF.
    #[arg(long)]
    pub local: bool,

    /// Scale every memory request by this factor.
    #[arg(long, value_name = "F")]
    pub memory_multiplier: Option<f64>,

    /// Directory holding the curated assembly (post-processing chain).
    #[arg(long, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Assembly file stem, e.g. `mySample.1` for `mySample.1.primary.curated.fa`.
    #[arg(long, value_name = "NAME")]
    pub stem: Option<String>,

    /// Label used in logs and the failure diagnostic.
    #[arg(long, value_name = "NAME")]
    pub run_name: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BATCHDAG_LOG`, the config file or `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate and print the jobs in execution order without running them.
    #[arg(long)]
    pub dry_run: bool,

    /// Check executables, scripts and directories, then exit.
    #[arg(long)]
    pub check_env: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
