// src/errors.rs

//! Crate-wide error types.
//!
//! - [`ValidationError`]: the job graph is malformed; raised before any
//!   submission happens.
//! - [`ExecutorError`]: something went wrong while handing a job to, or
//!   hearing back from, an execution backend.
//! - [`BatchdagError`]: everything else, plus wrappers for the two above.

use thiserror::Error;

use crate::dag::{JobName, JobStatus};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("duplicate job name '{0}'")]
    DuplicateJob(JobName),

    #[error("job '{0}' has no command")]
    MissingCommand(JobName),

    #[error("job '{job}' depends on unknown job '{dependency}'")]
    UnknownDependency { job: JobName, dependency: JobName },

    /// Closed walk through the dependency relation: every element depends on
    /// the next one, and the first and last elements are the same job.
    #[error("cycle detected in job graph: {}", .0.join(" -> "))]
    Cycle(Vec<JobName>),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("job '{job}' has already been submitted")]
    AlreadySubmitted { job: JobName },

    #[error("failed to submit job '{job}': {message}")]
    Submission { job: JobName, message: String },

    #[error("job '{job}' failed: {message}")]
    Execution {
        job: JobName,
        message: String,
        exit_code: Option<i32>,
    },

    #[error("status query failed: {0}")]
    MonitoringTransient(String),

    #[error("failed to kill job '{job}': {message}")]
    Kill { job: JobName, message: String },
}

#[derive(Error, Debug)]
pub enum BatchdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid workflow: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("Job not found: {0}")]
    UnknownJob(JobName),

    #[error("job '{job}' cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        job: JobName,
        from: JobStatus,
        to: JobStatus,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BatchdagError>;
