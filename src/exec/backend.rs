// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! The driver talks to an [`Executor`] and never to a concrete backend. Two
//! implementations ship with the crate:
//!
//! - [`LocalExecutor`](super::LocalExecutor) runs each job synchronously as a
//!   subprocess; `submit` resolves once the command has exited.
//! - [`RemoteExecutor`](super::RemoteExecutor) hands jobs to a batch cluster
//!   and learns about completion through [`Executor::monitor`].
//!
//! Tests provide their own implementation that records submissions and
//! reports scripted outcomes without spawning anything.

use std::future::Future;
use std::pin::Pin;

use crate::dag::{Job, JobName, JobStatus};
use crate::errors::ExecutorError;

/// Boxed future returned by executor methods.
pub type ExecFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What happened when a job was handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The job ran to successful completion during `submit`.
    Finished,
    /// The job was accepted by a remote backend and is now outstanding.
    Queued { remote_id: String },
}

/// Status change observed by [`Executor::monitor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub job: JobName,
    pub status: JobStatus,
    pub error: Option<String>,
}

impl StatusUpdate {
    pub fn completed(job: impl Into<JobName>) -> Self {
        Self {
            job: job.into(),
            status: JobStatus::Completed,
            error: None,
        }
    }

    pub fn failed(job: impl Into<JobName>, error: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            status: JobStatus::Failed,
            error: Some(error.into()),
        }
    }
}

/// Contract shared by every execution backend.
///
/// Executors never mutate job status directly: they report outcomes and the
/// driver applies them to the [`Workflow`](crate::dag::Workflow).
pub trait Executor: Send {
    /// Short backend name for logs.
    fn kind(&self) -> &'static str;

    /// Hand a job to the backend.
    ///
    /// Callers must only submit jobs whose readiness predicate holds.
    /// Submitting the same job twice fails with
    /// [`ExecutorError::AlreadySubmitted`].
    fn submit<'a>(&'a mut self, job: &'a Job)
        -> ExecFuture<'a, Result<Submission, ExecutorError>>;

    /// Refresh the status of every outstanding job and return the ones that
    /// reached a terminal state. May sleep for a polling interval.
    ///
    /// Transient failures of the status query are logged and reported as "no
    /// updates"; the next call retries.
    fn monitor(&mut self) -> ExecFuture<'_, Vec<StatusUpdate>>;

    /// Cancel one outstanding job. Unknown or finished jobs are a no-op.
    fn kill<'a>(&'a mut self, job: &'a str) -> ExecFuture<'a, Result<(), ExecutorError>>;

    /// Best-effort cancellation of everything still outstanding.
    fn cleanup(&mut self) -> ExecFuture<'_, ()>;

    /// Jobs submitted but not yet seen to finish.
    fn outstanding(&self) -> Vec<JobName>;
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn kind(&self) -> &'static str {
        (**self).kind()
    }

    fn submit<'a>(
        &'a mut self,
        job: &'a Job,
    ) -> ExecFuture<'a, Result<Submission, ExecutorError>> {
        (**self).submit(job)
    }

    fn monitor(&mut self) -> ExecFuture<'_, Vec<StatusUpdate>> {
        (**self).monitor()
    }

    fn kill<'a>(&'a mut self, job: &'a str) -> ExecFuture<'a, Result<(), ExecutorError>> {
        (**self).kill(job)
    }

    fn cleanup(&mut self) -> ExecFuture<'_, ()> {
        (**self).cleanup()
    }

    fn outstanding(&self) -> Vec<JobName> {
        (**self).outstanding()
    }
}
