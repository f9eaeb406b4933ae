// src/exec/dialect.rs

//! Translation between abstract jobs and one batch-cluster CLI.
//!
//! [`RemoteExecutor`](super::RemoteExecutor) owns the bookkeeping (remote ids,
//! outstanding set, polling); a [`BatchDialect`] only knows how to spell
//! commands and read their output. Targeting another scheduler means writing
//! another dialect.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::dag::Job;

/// A program plus its arguments, ready for a [`CommandRunner`](super::CommandRunner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl BatchCommand {
    /// Render for logs.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Everything a dialect needs to build one submission.
#[derive(Debug, Clone)]
pub struct SubmitRequest<'a> {
    pub job: &'a Job,
    /// Queue to use: the job's own request, or the executor default.
    pub queue: &'a str,
    /// Remote ids of dependencies that were already submitted.
    pub dependency_ids: &'a [String],
    /// Directory for the job's stdout/stderr files.
    pub logs_dir: &'a Path,
}

/// Backend view of a job's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteState {
    /// Finished successfully.
    Done,
    /// Finished unsuccessfully.
    Exit,
    /// Anything else (pending, running, suspended, ...).
    Active(String),
}

pub trait BatchDialect: Send + Sync {
    fn submit_command(&self, request: &SubmitRequest<'_>) -> BatchCommand;

    /// Recover the remote id from the submission acknowledgment.
    fn parse_submission(&self, stdout: &str) -> Option<String>;

    /// One batched query covering all `ids`.
    fn status_command(&self, ids: &[String]) -> BatchCommand;

    /// Parse one line of status output into `(remote_id, state)`.
    fn parse_status_line(&self, line: &str) -> Option<(String, RemoteState)>;

    fn kill_command(&self, id: &str) -> BatchCommand;
}

/// LSF (`bsub` / `bjobs` / `bkill`).
#[derive(Debug, Clone)]
pub struct LsfDialect {
    submit_program: String,
    status_program: String,
    kill_program: String,
    ack_regex: Regex,
}

impl LsfDialect {
    /// Stock program names from `PATH`.
    pub fn standard() -> Result<Self, regex::Error> {
        Self::new("bsub", "bjobs", "bkill")
    }

    /// Build a dialect with custom program names (e.g. wrapper scripts or
    /// absolute paths).
    pub fn new(
        submit_program: impl Into<String>,
        status_program: impl Into<String>,
        kill_program: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        // The id is the text between the first '<' and the next '>'.
        let ack_regex = Regex::new(r"<([^>]*)>")?;
        Ok(Self {
            submit_program: submit_program.into(),
            status_program: status_program.into(),
            kill_program: kill_program.into(),
            ack_regex,
        })
    }

    /// `done(1) && done(2)`, or `None` when nothing was submitted yet.
    pub fn dependency_expression(ids: &[String]) -> Option<String> {
        if ids.is_empty() {
            return None;
        }
        Some(
            ids.iter()
                .map(|id| format!("done({id})"))
                .collect::<Vec<_>>()
                .join(" && "),
        )
    }

    fn log_path(logs_dir: &Path, job: &str, ext: &str) -> PathBuf {
        logs_dir.join(format!("{job}.{ext}"))
    }
}

impl BatchDialect for LsfDialect {
    fn submit_command(&self, request: &SubmitRequest<'_>) -> BatchCommand {
        let job = request.job;
        let mut args = Vec::new();

        if let Some(mem) = job.resources.mem_mb {
            args.push("-M".to_string());
            args.push(mem.to_string());
        }

        args.push("-q".to_string());
        args.push(request.queue.to_string());

        args.push("-J".to_string());
        args.push(job.name.clone());

        args.push("-o".to_string());
        args.push(Self::log_path(request.logs_dir, &job.name, "out").display().to_string());
        args.push("-e".to_string());
        args.push(Self::log_path(request.logs_dir, &job.name, "err").display().to_string());

        if let Some(expr) = Self::dependency_expression(request.dependency_ids) {
            args.push("-w".to_string());
            args.push(expr);
        }

        if let Some(command) = &job.command {
            args.push(command.to_shell_string());
        }

        BatchCommand {
            program: self.submit_program.clone(),
            args,
        }
    }

    fn parse_submission(&self, stdout: &str) -> Option<String> {
        let caps = self.ack_regex.captures(stdout)?;
        let id = caps.get(1)?.as_str().trim();
        if id.is_empty() {
            None
        } else {
            Some(id.to_string())
        }
    }

    fn status_command(&self, ids: &[String]) -> BatchCommand {
        let mut args = vec!["-noheader".to_string()];
        args.extend(ids.iter().cloned());
        BatchCommand {
            program: self.status_program.clone(),
            args,
        }
    }

    /// `bjobs -noheader` lines look like `ID USER STAT QUEUE ...`.
    fn parse_status_line(&self, line: &str) -> Option<(String, RemoteState)> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            return None;
        }
        let state = match fields[2] {
            "DONE" => RemoteState::Done,
            "EXIT" => RemoteState::Exit,
            other => RemoteState::Active(other.to_string()),
        };
        Some((fields[0].to_string(), state))
    }

    fn kill_command(&self, id: &str) -> BatchCommand {
        BatchCommand {
            program: self.kill_program.clone(),
            args: vec![id.to_string()],
        }
    }
}
