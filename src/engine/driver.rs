// src/engine/driver.rs

//! The run loop.
//!
//! A single control task alternates between "submit everything that is
//! ready" and "ask the executor what finished" until the workflow reaches a
//! terminal state. The only suspension points are inside the executor: a
//! local command running to completion, or a remote poll sleeping.

use std::fmt;

use tracing::{debug, error, info, warn};

use crate::dag::{JobFailure, JobName, JobStatus, Workflow};
use crate::engine::observer::RunObserver;
use crate::errors::{BatchdagError, Result};
use crate::exec::{Executor, StatusUpdate, Submission};
use crate::types::FailurePolicy;

/// Knobs for [`Driver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverOptions {
    pub failure_policy: FailurePolicy,
}

/// Driver state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Running,
    Succeeded,
    Failed,
    Deadlocked,
}

/// A pending job that can never become ready, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedJob {
    pub job: JobName,
    pub reasons: Vec<String>,
}

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    Failed { failures: Vec<JobFailure> },
    Deadlocked { blocked: Vec<BlockedJob> },
}

/// Everything a caller needs to report a run upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub workflow: String,
    pub outcome: RunOutcome,
    /// Loop iterations taken, including the final one.
    pub iterations: u64,
    /// Jobs handed to the executor, in submission order.
    pub submitted: Vec<JobName>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Succeeded)
    }

    pub fn state(&self) -> DriverState {
        match self.outcome {
            RunOutcome::Succeeded => DriverState::Succeeded,
            RunOutcome::Failed { .. } => DriverState::Failed,
            RunOutcome::Deadlocked { .. } => DriverState::Deadlocked,
        }
    }

    pub fn failures(&self) -> &[JobFailure] {
        match &self.outcome {
            RunOutcome::Failed { failures } => failures,
            _ => &[],
        }
    }

    pub fn failed_jobs(&self) -> Vec<&str> {
        self.failures().iter().map(|f| f.job.as_str()).collect()
    }

    /// Multi-line, human-readable summary suitable for a ticket comment.
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            RunOutcome::Succeeded => {
                write!(f, "workflow '{}' succeeded", self.workflow)
            }
            RunOutcome::Failed { failures } => {
                write!(
                    f,
                    "workflow '{}' failed: {} job(s) failed",
                    self.workflow,
                    failures.len()
                )?;
                for failure in failures {
                    write!(f, "\n  - {}: {}", failure.job, failure.message)?;
                }
                Ok(())
            }
            RunOutcome::Deadlocked { blocked } => {
                write!(
                    f,
                    "workflow '{}' deadlocked: {} job(s) can never become ready",
                    self.workflow,
                    blocked.len()
                )?;
                for b in blocked {
                    write!(f, "\n  - {}: {}", b.job, b.reasons.join("; "))?;
                }
                Ok(())
            }
        }
    }
}

/// Drives one [`Workflow`] to completion through one [`Executor`].
///
/// Both are owned by the driver for the duration of the run; build a fresh
/// driver per pipeline invocation.
pub struct Driver<E: Executor> {
    workflow: Workflow,
    executor: E,
    options: DriverOptions,
    observers: Vec<Box<dyn RunObserver>>,
    state: DriverState,
    iterations: u64,
    submitted: Vec<JobName>,
}

impl<E: Executor> fmt::Debug for Driver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("workflow", &self.workflow)
            .field("executor", &self.executor.kind())
            .field("options", &self.options)
            .field("state", &self.state)
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

impl<E: Executor> Driver<E> {
    pub fn new(workflow: Workflow, executor: E, options: DriverOptions) -> Self {
        Self {
            workflow,
            executor,
            options,
            observers: Vec::new(),
            state: DriverState::Running,
            iterations: 0,
            submitted: Vec::new(),
        }
    }

    /// Register a callback for the end of the run.
    pub fn with_observer(mut self, observer: impl RunObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Validate, then loop until the workflow succeeds, fails or deadlocks.
    ///
    /// Returns `Err` only when the graph is invalid (nothing was submitted)
    /// or when bookkeeping breaks (an executor reporting an impossible
    /// transition). Job failures come back as `Ok` with a failed report.
    pub async fn run(&mut self) -> Result<RunReport> {
        self.state = DriverState::Running;
        self.iterations = 0;
        self.submitted.clear();

        info!(
            workflow = %self.workflow.label(),
            jobs = self.workflow.len(),
            executor = self.executor.kind(),
            policy = ?self.options.failure_policy,
            "starting workflow"
        );

        if let Err(err) = self.workflow.validate() {
            self.state = DriverState::Failed;
            error!(workflow = %self.workflow.label(), error = %err, "workflow validation failed");
            let diagnostic = format!(
                "workflow '{}' failed validation: {err}",
                self.workflow.label()
            );
            self.notify_failure(&diagnostic);
            return Err(err.into());
        }

        let outcome = match self.drive().await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.state = DriverState::Failed;
                let diagnostic = format!("workflow '{}' aborted: {err}", self.workflow.label());
                self.notify_failure(&diagnostic);
                return Err(err);
            }
        };

        let report = RunReport {
            workflow: self.workflow.label().to_string(),
            outcome,
            iterations: self.iterations,
            submitted: self.submitted.clone(),
        };
        self.state = report.state();

        if report.is_success() {
            info!(workflow = %report.workflow, iterations = report.iterations, "workflow succeeded");
            for observer in self.observers.iter_mut() {
                observer.on_success(&report);
            }
        } else {
            error!(workflow = %report.workflow, state = ?self.state, "workflow did not succeed");
            let diagnostic = report.diagnostic();
            self.notify_failure(&diagnostic);
        }

        Ok(report)
    }

    /// Cancel whatever the executor still has outstanding.
    pub async fn shutdown(&mut self) {
        let outstanding = self.executor.outstanding();
        if !outstanding.is_empty() {
            warn!(?outstanding, "cancelling outstanding jobs");
        }
        self.executor.cleanup().await;
    }

    async fn drive(&mut self) -> Result<RunOutcome> {
        loop {
            self.iterations += 1;
            let ready = self.workflow.ready_job_names();
            debug!(iteration = self.iterations, ?ready, "driver iteration");

            if ready.is_empty() {
                if let Some(outcome) = self.settle() {
                    return Ok(outcome);
                }
                let updates = self.executor.monitor().await;
                if let Some(outcome) = self.apply_updates(updates)? {
                    return Ok(outcome);
                }
                continue;
            }

            if let Some(outcome) = self.submit_batch(ready).await? {
                return Ok(outcome);
            }
        }
    }

    /// Nothing is ready: decide whether the run is over. `None` means jobs
    /// are still running and the executor should be polled.
    fn settle(&self) -> Option<RunOutcome> {
        let failed = self.workflow.any_failed();
        let running = self.workflow.any_running();

        let failed_outcome = || RunOutcome::Failed {
            failures: self.workflow.failures(),
        };

        match self.options.failure_policy {
            FailurePolicy::FailFast if failed => return Some(failed_outcome()),
            FailurePolicy::ContinueIndependent if running => {}
            FailurePolicy::ContinueIndependent if failed => return Some(failed_outcome()),
            _ => {}
        }

        if self.workflow.all_completed() {
            return Some(RunOutcome::Succeeded);
        }

        if running {
            if self.executor.outstanding().is_empty() {
                // Jobs marked running that the executor does not track
                // would be polled forever.
                warn!("running jobs are not tracked by the executor");
                return Some(self.deadlocked());
            }
            return None;
        }

        warn!(workflow = %self.workflow.label(), "no job is ready or running; deadlocked");
        Some(self.deadlocked())
    }

    fn deadlocked(&self) -> RunOutcome {
        let blocked = self
            .workflow
            .jobs()
            .filter(|job| !job.status().is_terminal())
            .map(|job| {
                let mut reasons = self.workflow.unmet_requirements(job);
                if job.status() == JobStatus::Running {
                    reasons.push("running but not tracked by the executor".to_string());
                }
                BlockedJob {
                    job: job.name.clone(),
                    reasons,
                }
            })
            .collect();
        RunOutcome::Deadlocked { blocked }
    }

    fn apply_updates(&mut self, updates: Vec<StatusUpdate>) -> Result<Option<RunOutcome>> {
        let mut saw_failure = false;

        for update in updates {
            saw_failure |= update.status == JobStatus::Failed;
            self.workflow
                .update_status(&update.job, update.status, update.error)?;
        }

        if saw_failure && self.options.failure_policy == FailurePolicy::FailFast {
            error!("job failed on the backend; stopping run (fail-fast)");
            return Ok(Some(RunOutcome::Failed {
                failures: self.workflow.failures(),
            }));
        }

        Ok(None)
    }

    /// Submit every job in `ready`, in order. Returns an outcome if the
    /// failure policy ends the run part-way through the batch.
    async fn submit_batch(&mut self, ready: Vec<JobName>) -> Result<Option<RunOutcome>> {
        for name in ready {
            let still_ready = self
                .workflow
                .job(&name)
                .is_some_and(|job| job.status() == JobStatus::Pending && self.workflow.is_ready(job));
            if !still_ready {
                debug!(job = %name, "job no longer ready; skipping this iteration");
                continue;
            }

            self.workflow.update_status(&name, JobStatus::Running, None)?;
            self.submitted.push(name.clone());

            let job = self
                .workflow
                .job(&name)
                .ok_or_else(|| BatchdagError::UnknownJob(name.clone()))?;
            let result = self.executor.submit(job).await;

            match result {
                Ok(Submission::Finished) => {
                    self.workflow.update_status(&name, JobStatus::Completed, None)?;
                }
                Ok(Submission::Queued { remote_id }) => {
                    debug!(job = %name, %remote_id, "job outstanding on backend");
                }
                Err(err) => {
                    error!(job = %name, error = %err, "job submission failed");
                    self.workflow
                        .update_status(&name, JobStatus::Failed, Some(err.to_string()))?;

                    if self.options.failure_policy == FailurePolicy::FailFast {
                        // Jobs already handed over in this batch keep running.
                        return Ok(Some(RunOutcome::Failed {
                            failures: self.workflow.failures(),
                        }));
                    }
                }
            }
        }

        Ok(None)
    }

    fn notify_failure(&mut self, diagnostic: &str) {
        for observer in self.observers.iter_mut() {
            observer.on_failure(diagnostic);
        }
    }
}
