// src/dag/workflow.rs

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::job::{Job, JobName, JobStatus};
use crate::dag::validate::validate_jobs;
use crate::errors::{BatchdagError, Result, ValidationError};
use crate::fs::{FileSystem, RealFileSystem};

/// Failure recorded against a single job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub job: JobName,
    pub message: String,
}

/// The job graph for one pipeline run.
///
/// Owns every [`Job`], keyed by name. Iteration and submission order is
/// insertion order, so two runs over the same graph make the same decisions.
#[derive(Debug, Clone)]
pub struct Workflow {
    label: String,
    jobs: Vec<Job>,
    index: HashMap<JobName, usize>,
    fs: Arc<dyn FileSystem>,
}

impl Workflow {
    /// Empty workflow that checks input files on the real filesystem.
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_filesystem(label, Arc::new(RealFileSystem))
    }

    pub fn with_filesystem(label: impl Into<String>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            label: label.into(),
            jobs: Vec::new(),
            index: HashMap::new(),
            fs,
        }
    }

    /// Human-readable run label (ticket, sample, ...), used in logs only.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Add a job. Fails if a job with the same name already exists.
    pub fn add_job(&mut self, job: Job) -> std::result::Result<(), ValidationError> {
        if self.index.contains_key(&job.name) {
            return Err(ValidationError::DuplicateJob(job.name));
        }
        debug!(workflow = %self.label, job = %job.name, "adding job");
        self.index.insert(job.name.clone(), self.jobs.len());
        self.jobs.push(job);
        Ok(())
    }

    pub fn job(&self, name: &str) -> Option<&Job> {
        self.index.get(name).map(|&i| &self.jobs[i])
    }

    /// All jobs, in insertion order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Check that every job has a command, every dependency exists, and the
    /// dependency relation is acyclic. An empty workflow is valid.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        validate_jobs(&self.jobs, &self.index)
    }

    /// Readiness predicate: every dependency is `Completed` and every input
    /// file currently exists.
    ///
    /// Does not look at the job's own status; see [`Workflow::get_ready_jobs`].
    pub fn is_ready(&self, job: &Job) -> bool {
        let deps_done = job.dependencies.iter().all(|dep| {
            self.job(dep)
                .is_some_and(|d| d.status == JobStatus::Completed)
        });
        deps_done && job.input_files.iter().all(|f| self.fs.exists(f))
    }

    /// `Pending` jobs whose readiness predicate holds, in insertion order.
    ///
    /// Calling this twice without a status change in between returns the
    /// same jobs (modulo input files appearing on disk).
    pub fn get_ready_jobs(&self) -> Vec<&Job> {
        self.jobs
            .iter()
            .filter(|job| job.status == JobStatus::Pending && self.is_ready(job))
            .collect()
    }

    /// Names of [`Workflow::get_ready_jobs`], for callers that need to
    /// mutate the workflow while walking the batch.
    pub fn ready_job_names(&self) -> Vec<JobName> {
        self.get_ready_jobs()
            .into_iter()
            .map(|job| job.name.clone())
            .collect()
    }

    /// Apply a status transition and log it.
    ///
    /// `error` is stored only for `Failed`; a failure without a message gets a
    /// generic one so failed jobs always carry text.
    pub fn update_status(
        &mut self,
        name: &str,
        status: JobStatus,
        error: Option<String>,
    ) -> Result<()> {
        let idx = *self
            .index
            .get(name)
            .ok_or_else(|| BatchdagError::UnknownJob(name.to_string()))?;
        let job = &mut self.jobs[idx];
        let from = job.status;

        if !from.can_transition_to(status) {
            warn!(job = %name, %from, to = %status, "rejected status transition");
            return Err(BatchdagError::InvalidTransition {
                job: name.to_string(),
                from,
                to: status,
            });
        }

        job.status = status;
        if status == JobStatus::Failed {
            let message = error
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| format!("job '{name}' failed"));
            warn!(job = %name, %from, to = %status, error = %message, "job status changed");
            job.error = Some(message);
        } else {
            info!(job = %name, %from, to = %status, "job status changed");
            job.error = None;
        }

        Ok(())
    }

    pub fn all_completed(&self) -> bool {
        self.jobs.iter().all(|job| job.status == JobStatus::Completed)
    }

    pub fn any_running(&self) -> bool {
        self.jobs.iter().any(|job| job.status == JobStatus::Running)
    }

    pub fn any_failed(&self) -> bool {
        self.jobs.iter().any(|job| job.status == JobStatus::Failed)
    }

    /// Every failed job with its message, in insertion order.
    pub fn failures(&self) -> Vec<JobFailure> {
        self.jobs
            .iter()
            .filter(|job| job.status == JobStatus::Failed)
            .map(|job| JobFailure {
                job: job.name.clone(),
                message: job
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("job '{}' failed", job.name)),
            })
            .collect()
    }

    /// Why a job is not ready: unfinished dependencies and missing inputs.
    pub fn unmet_requirements(&self, job: &Job) -> Vec<String> {
        let mut reasons = Vec::new();
        for dep in &job.dependencies {
            match self.job(dep) {
                Some(d) if d.status == JobStatus::Completed => {}
                Some(d) => reasons.push(format!("dependency '{dep}' is {}", d.status)),
                None => reasons.push(format!("dependency '{dep}' does not exist")),
            }
        }
        for file in &job.input_files {
            if !self.fs.exists(file) {
                reasons.push(format!("input file {} is missing", file.display()));
            }
        }
        reasons
    }
}
