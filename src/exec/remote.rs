// src/exec/remote.rs

//! Asynchronous submission to a batch cluster.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::dag::{Job, JobName};
use crate::errors::ExecutorError;

use super::backend::{ExecFuture, Executor, StatusUpdate, Submission};
use super::dialect::{BatchCommand, BatchDialect, LsfDialect, RemoteState, SubmitRequest};
use super::process::{CommandOutput, CommandRunner, ProcessRunner};

/// Knobs for [`RemoteExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSettings {
    /// Queue for jobs that do not request one.
    pub default_queue: String,
    /// Sleep between status polls that saw no progress.
    pub poll_interval: Duration,
    /// Where the backend writes each job's stdout/stderr.
    pub logs_dir: PathBuf,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            default_queue: "normal".to_string(),
            poll_interval: Duration::from_secs(30),
            logs_dir: PathBuf::from("logs"),
        }
    }
}

/// Submits jobs through a [`BatchDialect`] and polls for their completion.
///
/// State is per instance: every run builds a fresh executor, so nothing
/// leaks between runs or between tests.
#[derive(Debug)]
pub struct RemoteExecutor<D: BatchDialect = LsfDialect, R: CommandRunner = ProcessRunner> {
    dialect: D,
    runner: R,
    settings: RemoteSettings,
    /// Every job this executor has submitted, by name.
    remote_ids: HashMap<JobName, String>,
    /// Submitted jobs not yet seen in a terminal state, by remote id.
    outstanding: BTreeMap<String, JobName>,
}

impl RemoteExecutor<LsfDialect, ProcessRunner> {
    /// LSF executor that shells out to the real `bsub`/`bjobs`/`bkill`.
    pub fn lsf(settings: RemoteSettings) -> Result<Self, regex::Error> {
        Ok(Self::new(LsfDialect::standard()?, ProcessRunner::new(), settings))
    }
}

impl<D: BatchDialect, R: CommandRunner> RemoteExecutor<D, R> {
    pub fn new(dialect: D, runner: R, settings: RemoteSettings) -> Self {
        Self {
            dialect,
            runner,
            settings,
            remote_ids: HashMap::new(),
            outstanding: BTreeMap::new(),
        }
    }

    pub fn settings(&self) -> &RemoteSettings {
        &self.settings
    }

    /// Remote id assigned to `job`, if it was submitted.
    pub fn remote_id(&self, job: &str) -> Option<&str> {
        self.remote_ids.get(job).map(String::as_str)
    }

    async fn run(&self, command: &BatchCommand) -> std::io::Result<CommandOutput> {
        self.runner.run(&command.program, &command.args).await
    }

    async fn submit_job(&mut self, job: &Job) -> Result<Submission, ExecutorError> {
        if self.remote_ids.contains_key(&job.name) {
            return Err(ExecutorError::AlreadySubmitted {
                job: job.name.clone(),
            });
        }

        let dependency_ids: Vec<String> = job
            .dependencies
            .iter()
            .filter_map(|dep| self.remote_ids.get(dep).cloned())
            .collect();
        let queue = job
            .resources
            .queue
            .as_deref()
            .unwrap_or(&self.settings.default_queue);

        let command = self.dialect.submit_command(&SubmitRequest {
            job,
            queue,
            dependency_ids: &dependency_ids,
            logs_dir: &self.settings.logs_dir,
        });
        info!(job = %job.name, cmd = %command.display(), "submitting job");

        let submission_error = |message: String| ExecutorError::Submission {
            job: job.name.clone(),
            message,
        };

        let output = self
            .run(&command)
            .await
            .map_err(|e| submission_error(format!("could not run '{}': {e}", command.program)))?;

        if !output.success() {
            let detail = output.stderr.trim();
            let message = if detail.is_empty() {
                format!("{} exited with {:?}", command.program, output.code)
            } else {
                format!("{} exited with {:?}: {detail}", command.program, output.code)
            };
            error!(job = %job.name, error = %message, "submission rejected");
            return Err(submission_error(message));
        }

        let remote_id = self.dialect.parse_submission(&output.stdout).ok_or_else(|| {
            submission_error(format!(
                "could not find a job id in submission output: {}",
                output.stdout.trim()
            ))
        })?;

        info!(job = %job.name, %remote_id, "job submitted");
        self.remote_ids.insert(job.name.clone(), remote_id.clone());
        self.outstanding.insert(remote_id.clone(), job.name.clone());

        Ok(Submission::Queued { remote_id })
    }

    /// One batched status query. Sleeps for the poll interval afterwards if
    /// jobs are still outstanding and none of them finished.
    async fn poll(&mut self) -> Vec<StatusUpdate> {
        if self.outstanding.is_empty() {
            return Vec::new();
        }

        let ids: Vec<String> = self.outstanding.keys().cloned().collect();
        let command = self.dialect.status_command(&ids);
        debug!(cmd = %command.display(), "polling job status");

        let updates = match self.query(&command).await {
            Ok(stdout) => self.apply_status_output(&stdout),
            Err(err) => {
                warn!(error = %err, "job status query failed; retrying on next poll");
                Vec::new()
            }
        };

        if updates.is_empty() && !self.outstanding.is_empty() {
            debug!(
                interval_secs = self.settings.poll_interval.as_secs_f64(),
                outstanding = self.outstanding.len(),
                "no job finished; sleeping before next poll"
            );
            tokio::time::sleep(self.settings.poll_interval).await;
        }

        updates
    }

    async fn query(&self, command: &BatchCommand) -> Result<String, ExecutorError> {
        let output = self.run(command).await.map_err(|e| {
            ExecutorError::MonitoringTransient(format!("could not run '{}': {e}", command.program))
        })?;

        // bjobs exits non-zero when some ids are unknown but still prints the
        // rest, so only an empty stdout counts as a failed query.
        if !output.success() && output.stdout.trim().is_empty() {
            return Err(ExecutorError::MonitoringTransient(format!(
                "{} exited with {:?}: {}",
                command.program,
                output.code,
                output.stderr.trim()
            )));
        }

        Ok(output.stdout)
    }

    fn apply_status_output(&mut self, stdout: &str) -> Vec<StatusUpdate> {
        let mut updates = Vec::new();

        for line in stdout.lines() {
            let Some((remote_id, state)) = self.dialect.parse_status_line(line) else {
                continue;
            };
            let Some(job) = self.outstanding.get(&remote_id).cloned() else {
                debug!(%remote_id, "status for job we are not tracking; ignoring");
                continue;
            };

            match state {
                RemoteState::Done => {
                    info!(job = %job, %remote_id, "job completed successfully");
                    self.outstanding.remove(&remote_id);
                    updates.push(StatusUpdate::completed(job));
                }
                RemoteState::Exit => {
                    error!(job = %job, %remote_id, "job failed");
                    self.outstanding.remove(&remote_id);
                    updates.push(StatusUpdate::failed(
                        job,
                        format!("remote job {remote_id} finished with status EXIT"),
                    ));
                }
                RemoteState::Active(state) => {
                    debug!(job = %job, %remote_id, %state, "job still active");
                }
            }
        }

        updates
    }

    async fn kill_job(&mut self, job: &str) -> Result<(), ExecutorError> {
        let Some(remote_id) = self.remote_ids.get(job).cloned() else {
            debug!(job = %job, "kill requested for job that was never submitted");
            return Ok(());
        };
        if !self.outstanding.contains_key(&remote_id) {
            debug!(job = %job, %remote_id, "kill requested for finished job");
            return Ok(());
        }

        let command = self.dialect.kill_command(&remote_id);
        let kill_error = |message: String| ExecutorError::Kill {
            job: job.to_string(),
            message,
        };

        let output = self
            .run(&command)
            .await
            .map_err(|e| kill_error(format!("could not run '{}': {e}", command.program)))?;
        if !output.success() {
            return Err(kill_error(output.stderr.trim().to_string()));
        }

        info!(job = %job, %remote_id, "killed job");
        self.outstanding.remove(&remote_id);
        Ok(())
    }
}

impl<D: BatchDialect, R: CommandRunner> Executor for RemoteExecutor<D, R> {
    fn kind(&self) -> &'static str {
        "remote"
    }

    fn submit<'a>(
        &'a mut self,
        job: &'a Job,
    ) -> ExecFuture<'a, Result<Submission, ExecutorError>> {
        Box::pin(self.submit_job(job))
    }

    fn monitor(&mut self) -> ExecFuture<'_, Vec<StatusUpdate>> {
        Box::pin(self.poll())
    }

    fn kill<'a>(&'a mut self, job: &'a str) -> ExecFuture<'a, Result<(), ExecutorError>> {
        Box::pin(self.kill_job(job))
    }

    fn cleanup(&mut self) -> ExecFuture<'_, ()> {
        Box::pin(async move {
            let jobs: Vec<JobName> = self.outstanding.values().cloned().collect();
            for job in jobs {
                if let Err(err) = self.kill_job(&job).await {
                    error!(job = %job, error = %err, "cleanup could not kill job");
                }
            }
        })
    }

    fn outstanding(&self) -> Vec<JobName> {
        self.outstanding.values().cloned().collect()
    }
}
