// src/exec/local.rs

//! Synchronous local execution.

use std::collections::HashSet;

use tracing::{debug, error, info};

use crate::dag::{Job, JobName};
use crate::errors::ExecutorError;

use super::backend::{ExecFuture, Executor, StatusUpdate, Submission};
use super::process::{CommandOutput, CommandRunner, ProcessRunner};

/// How many trailing stderr lines end up in a failure message.
const STDERR_TAIL_LINES: usize = 20;

/// Runs each job's command as a local subprocess and waits for it.
///
/// `submit` blocks the driver for the full duration of the command, so
/// nothing is ever outstanding and `monitor` has nothing to report.
#[derive(Debug)]
pub struct LocalExecutor<R: CommandRunner = ProcessRunner> {
    runner: R,
    submitted: HashSet<JobName>,
}

impl LocalExecutor<ProcessRunner> {
    pub fn new() -> Self {
        Self::with_runner(ProcessRunner::new())
    }
}

impl Default for LocalExecutor<ProcessRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> LocalExecutor<R> {
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            submitted: HashSet::new(),
        }
    }

    async fn run_job(&self, job: &Job) -> Result<Submission, ExecutorError> {
        let command = job.command.as_ref().ok_or_else(|| ExecutorError::Submission {
            job: job.name.clone(),
            message: "job has no command".to_string(),
        })?;
        let (program, args) = command.to_program_args();

        info!(job = %job.name, cmd = %command, "running job locally");

        let output = self
            .runner
            .run(&program, &args)
            .await
            .map_err(|e| ExecutorError::Execution {
                job: job.name.clone(),
                message: format!("could not start '{program}': {e}"),
                exit_code: None,
            })?;

        for line in output.stdout.lines() {
            debug!(job = %job.name, "stdout: {}", line);
        }

        if output.success() {
            info!(job = %job.name, "job completed successfully");
            Ok(Submission::Finished)
        } else {
            let message = failure_message(&output);
            error!(job = %job.name, exit_code = ?output.code, error = %message, "job failed");
            Err(ExecutorError::Execution {
                job: job.name.clone(),
                message,
                exit_code: output.code,
            })
        }
    }
}

/// Build a non-empty failure message from the tail of stderr, falling back
/// to the exit status.
fn failure_message(output: &CommandOutput) -> String {
    let lines: Vec<&str> = output
        .stderr
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect();
    let status = match output.code {
        Some(code) => format!("exited with code {code}"),
        None => "terminated by signal".to_string(),
    };

    if lines.is_empty() {
        status
    } else {
        let tail = &lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..];
        format!("{status}: {}", tail.join("\n"))
    }
}

impl<R: CommandRunner> Executor for LocalExecutor<R> {
    fn kind(&self) -> &'static str {
        "local"
    }

    fn submit<'a>(
        &'a mut self,
        job: &'a Job,
    ) -> ExecFuture<'a, Result<Submission, ExecutorError>> {
        Box::pin(async move {
            if !self.submitted.insert(job.name.clone()) {
                return Err(ExecutorError::AlreadySubmitted {
                    job: job.name.clone(),
                });
            }
            self.run_job(job).await
        })
    }

    fn monitor(&mut self) -> ExecFuture<'_, Vec<StatusUpdate>> {
        Box::pin(async { Vec::new() })
    }

    fn kill<'a>(&'a mut self, job: &'a str) -> ExecFuture<'a, Result<(), ExecutorError>> {
        Box::pin(async move {
            debug!(job = %job, "local jobs finish inside submit; nothing to kill");
            Ok(())
        })
    }

    fn cleanup(&mut self) -> ExecFuture<'_, ()> {
        Box::pin(async {})
    }

    fn outstanding(&self) -> Vec<JobName> {
        Vec::new()
    }
}
