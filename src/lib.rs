// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod envcheck;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, default_config_path, load_or_default};
use crate::dag::{Workflow, execution_order};
use crate::engine::{Driver, DriverOptions, ErrorMarkerObserver, LoggingObserver};
use crate::envcheck::EnvironmentChecker;
use crate::exec::{Executor, LocalExecutor, LsfDialect, ProcessRunner, RemoteExecutor, RemoteSettings};
use crate::fs::RealFileSystem;
use crate::pipeline::{PathLayout, add_post_processing_jobs};
use crate::types::ExecutorKind;

/// Name of the marker file written next to the run's outputs on failure.
pub const ERROR_MARKER_FILE: &str = "batchdag.error";

/// Load the config named on the command line (or `Batchdag.toml` if present)
/// and apply CLI overrides.
pub fn load_config(args: &CliArgs) -> Result<ConfigFile> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => Some(default_config_path()).filter(|p| p.is_file()),
    };
    let mut cfg = load_or_default(path.as_deref())?;

    if args.local {
        cfg.config.executor = ExecutorKind::Local;
    }
    if let Some(multiplier) = args.memory_multiplier {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            bail!("--memory-multiplier must be a positive number (got {multiplier})");
        }
        cfg.config.memory_multiplier = multiplier;
    }

    Ok(cfg)
}

/// Assemble the workflow: `[job.*]` tables if the config has any, otherwise
/// the post-processing chain for `--working-dir` / `--stem`.
pub fn build_workflow(args: &CliArgs, cfg: &ConfigFile) -> Result<Workflow> {
    let label = args
        .run_name
        .clone()
        .or_else(|| args.stem.clone())
        .unwrap_or_else(|| "batchdag".to_string());
    let mut workflow = Workflow::with_filesystem(label, Arc::new(RealFileSystem));

    if !cfg.job.is_empty() {
        for job in cfg.configured_jobs() {
            workflow.add_job(job)?;
        }
        return Ok(workflow);
    }

    let (Some(working_dir), Some(stem)) = (&args.working_dir, &args.stem) else {
        bail!("no [job.*] tables in config; pass --working-dir and --stem to run post-processing");
    };
    let layout = PathLayout::new(working_dir, stem);
    add_post_processing_jobs(&mut workflow, &layout, cfg)?;
    Ok(workflow)
}

/// Executor chosen by `[config].executor`.
pub fn build_executor(cfg: &ConfigFile) -> Result<Box<dyn Executor>> {
    let executor: Box<dyn Executor> = match cfg.config.executor {
        ExecutorKind::Local => Box::new(LocalExecutor::new()),
        ExecutorKind::Lsf => {
            let dialect = LsfDialect::new(
                &cfg.remote.submit_command,
                &cfg.remote.status_command,
                &cfg.remote.kill_command,
            )?;
            let settings = RemoteSettings {
                default_queue: cfg.config.default_queue.clone(),
                poll_interval: cfg.poll_interval(),
                logs_dir: cfg.paths.logs_dir.clone(),
            };
            Box::new(RemoteExecutor::new(dialect, ProcessRunner::new(), settings))
        }
    };
    Ok(executor)
}

fn error_marker_path(args: &CliArgs, cfg: &ConfigFile) -> PathBuf {
    args.working_dir
        .as_ref()
        .unwrap_or(&cfg.paths.output_dir)
        .join(ERROR_MARKER_FILE)
}

/// High-level entry point used by `main.rs`.
///
/// Returns `Ok(true)` when the run (or check) succeeded, `Ok(false)` when
/// jobs failed, the graph deadlocked or the run was interrupted, and `Err`
/// for setup problems and invalid graphs.
pub async fn run(args: CliArgs, cfg: ConfigFile) -> Result<bool> {
    let uses_template = cfg.job.is_empty();

    if args.check_env {
        let report = EnvironmentChecker::from_config(&cfg, uses_template).check_and_log();
        return Ok(report.is_ok());
    }

    let workflow = build_workflow(&args, &cfg)?;

    if args.dry_run {
        print_dry_run(&workflow, &cfg)?;
        return Ok(true);
    }

    let executor = build_executor(&cfg)?;
    let options = DriverOptions {
        failure_policy: cfg.config.failure_policy,
    };
    let marker = error_marker_path(&args, &cfg);
    debug!(marker = %marker.display(), "error marker location");

    let mut driver = Driver::new(workflow, executor, options)
        .with_observer(LoggingObserver)
        .with_observer(ErrorMarkerObserver::new(marker));

    let interrupted = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                warn!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    let result = tokio::select! {
        result = driver.run() => Some(result),
        _ = interrupted => None,
    };

    match result {
        Some(Ok(report)) => Ok(report.is_success()),
        Some(Err(err)) => {
            driver.shutdown().await;
            Err(err.into())
        }
        None => {
            warn!("interrupted; cancelling outstanding jobs");
            driver.shutdown().await;
            Ok(false)
        }
    }
}

/// Print jobs in execution order with their commands and dependencies.
fn print_dry_run(workflow: &Workflow, cfg: &ConfigFile) -> Result<()> {
    workflow.validate()?;
    let order = execution_order(workflow)?;

    println!("batchdag dry-run: {}", workflow.label());
    println!("  config.executor = {:?}", cfg.config.executor);
    println!("  config.failure_policy = {:?}", cfg.config.failure_policy);
    println!("  config.memory_multiplier = {}", cfg.config.memory_multiplier);
    println!();

    println!("jobs ({}):", order.len());
    for name in &order {
        let Some(job) = workflow.job(name) else {
            continue;
        };
        println!("  - {name}");
        if let Some(command) = &job.command {
            println!("      cmd: {command}");
        }
        if !job.dependencies.is_empty() {
            println!("      after: {:?}", job.dependencies);
        }
        if let Some(mem) = job.resources.mem_mb {
            println!("      mem_mb: {mem}");
        }
        if let Some(queue) = &job.resources.queue {
            println!("      queue: {queue}");
        }
        for input in &job.input_files {
            println!("      input: {}", input.display());
        }
        for output in &job.output_files {
            println!("      output: {}", output.display());
        }
    }

    info!("dry-run complete (no execution)");
    Ok(())
}
