// src/dag/job.rs

//! Job definition and status.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

/// Canonical job name type used throughout the crate.
pub type JobName = String;

/// Lifecycle of a job within one run.
///
/// Transitions are monotonic: `Pending -> Running -> {Completed, Failed}`.
/// Nothing moves a job back to `Pending`; resubmission is a caller concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether `self -> next` is a legal transition. Same-state updates are
    /// accepted as no-ops.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Running) | (Running, Completed) | (Running, Failed)
        ) || self == next
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What a job runs. Opaque to the scheduler; only executors look inside.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum JobCommand {
    /// A single shell command line, run through `sh -c`.
    Shell(String),
    /// An argument vector, run directly without a shell.
    Argv(Vec<String>),
}

impl JobCommand {
    pub fn is_blank(&self) -> bool {
        match self {
            JobCommand::Shell(s) => s.trim().is_empty(),
            JobCommand::Argv(argv) => argv.first().is_none_or(|p| p.trim().is_empty()),
        }
    }

    /// Program and arguments for spawning the command as a local process.
    pub fn to_program_args(&self) -> (String, Vec<String>) {
        match self {
            JobCommand::Shell(s) => {
                if cfg!(windows) {
                    ("cmd".to_string(), vec!["/C".to_string(), s.clone()])
                } else {
                    ("sh".to_string(), vec!["-c".to_string(), s.clone()])
                }
            }
            JobCommand::Argv(argv) => {
                let mut iter = argv.iter().cloned();
                let program = iter.next().unwrap_or_default();
                (program, iter.collect())
            }
        }
    }

    /// Single command line, for backends that take the command as one
    /// string (e.g. the trailing argument of `bsub`).
    pub fn to_shell_string(&self) -> String {
        match self {
            JobCommand::Shell(s) => s.clone(),
            JobCommand::Argv(argv) => argv
                .iter()
                .map(|a| shell_quote(a))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl fmt::Display for JobCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_shell_string())
    }
}

impl From<&str> for JobCommand {
    fn from(s: &str) -> Self {
        JobCommand::Shell(s.to_string())
    }
}

impl From<String> for JobCommand {
    fn from(s: String) -> Self {
        JobCommand::Shell(s)
    }
}

impl From<Vec<String>> for JobCommand {
    fn from(argv: Vec<String>) -> Self {
        JobCommand::Argv(argv)
    }
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Resource request passed through to the executor.
///
/// The scheduler never interprets these; the remote executor turns them into
/// submission flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Resources {
    /// Memory limit in MB.
    #[serde(default)]
    pub mem_mb: Option<u64>,
    /// Batch queue; the executor's default queue is used when unset.
    #[serde(default)]
    pub queue: Option<String>,
}

impl Resources {
    /// Scale the memory request, truncating to whole megabytes.
    pub fn scaled(&self, multiplier: f64) -> Self {
        Self {
            mem_mb: self.mem_mb.map(|mb| (mb as f64 * multiplier) as u64),
            queue: self.queue.clone(),
        }
    }

    /// Fill unset fields from `fallback`.
    pub fn or(&self, fallback: &Resources) -> Self {
        Self {
            mem_mb: self.mem_mb.or(fallback.mem_mb),
            queue: self.queue.clone().or_else(|| fallback.queue.clone()),
        }
    }
}

/// A named unit of work.
///
/// Dependencies are held by name; the owning [`Workflow`](super::Workflow)
/// resolves them. `status` and `error` are only changed through
/// [`Workflow::update_status`](super::Workflow::update_status).
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub name: JobName,
    pub command: Option<JobCommand>,
    pub resources: Resources,
    pub dependencies: Vec<JobName>,
    pub input_files: Vec<PathBuf>,
    pub output_files: Vec<PathBuf>,
    pub(crate) status: JobStatus,
    pub(crate) error: Option<String>,
}

impl Job {
    pub fn new(name: impl Into<JobName>) -> Self {
        Self {
            name: name.into(),
            command: None,
            resources: Resources::default(),
            dependencies: Vec::new(),
            input_files: Vec::new(),
            output_files: Vec::new(),
            status: JobStatus::Pending,
            error: None,
        }
    }

    pub fn with_command(mut self, command: impl Into<JobCommand>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn after(mut self, dependency: impl Into<JobName>) -> Self {
        let dependency = dependency.into();
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_files.push(path.into());
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_files.push(path.into());
        self
    }

    pub fn mem_mb(mut self, mb: u64) -> Self {
        self.resources.mem_mb = Some(mb);
        self
    }

    pub fn queue(mut self, queue: impl Into<String>) -> Self {
        self.resources.queue = Some(queue.into());
        self
    }

    pub fn with_resources(mut self, resources: Resources) -> Self {
        self.resources = resources;
        self
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Failure message; only present when `status() == Failed`.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn has_command(&self) -> bool {
        self.command.as_ref().is_some_and(|c| !c.is_blank())
    }
}
