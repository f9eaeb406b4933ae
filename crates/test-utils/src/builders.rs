#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use batchdag::config::{ConfigFile, JobConfig, RawConfigFile};
use batchdag::dag::{Job, JobCommand, Resources, Workflow};
use batchdag::fs::FileSystem;
use batchdag::types::{ExecutorKind, FailurePolicy};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_job(mut self, name: &str, job: JobConfig) -> Self {
        self.config.job.insert(name.to_string(), job);
        self
    }

    pub fn with_resources(mut self, name: &str, mem_mb: Option<u64>, queue: Option<&str>) -> Self {
        self.config.resources.insert(
            name.to_string(),
            Resources {
                mem_mb,
                queue: queue.map(str::to_string),
            },
        );
        self
    }

    pub fn executor(mut self, kind: ExecutorKind) -> Self {
        self.config.config.executor = kind;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.config.failure_policy = policy;
        self
    }

    pub fn memory_multiplier(mut self, multiplier: f64) -> Self {
        self.config.config.memory_multiplier = multiplier;
        self
    }

    pub fn scripts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.paths.scripts_dir = dir.into();
        self
    }

    pub fn logs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.paths.logs_dir = dir.into();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `JobConfig`.
pub struct JobConfigBuilder {
    job: JobConfig,
}

impl JobConfigBuilder {
    pub fn new(command: &str) -> Self {
        Self {
            job: JobConfig {
                command: JobCommand::from(command),
                after: vec![],
                inputs: vec![],
                outputs: vec![],
                mem_mb: None,
                queue: None,
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.job.after.push(dep.to_string());
        self
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.job.inputs.push(path.into());
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.job.outputs.push(path.into());
        self
    }

    pub fn mem_mb(mut self, mb: u64) -> Self {
        self.job.mem_mb = Some(mb);
        self
    }

    pub fn queue(mut self, queue: &str) -> Self {
        self.job.queue = Some(queue.to_string());
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}

/// A job with a shell command and the given dependencies.
pub fn shell_job(name: &str, command: &str, deps: &[&str]) -> Job {
    deps.iter()
        .fold(Job::new(name).with_command(command), |job, dep| job.after(*dep))
}

/// Builder for a `Workflow` whose jobs are known to be addable.
pub struct WorkflowBuilder {
    workflow: Workflow,
}

impl WorkflowBuilder {
    pub fn new(label: &str) -> Self {
        Self {
            workflow: Workflow::new(label),
        }
    }

    pub fn with_filesystem(label: &str, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            workflow: Workflow::with_filesystem(label, fs),
        }
    }

    /// Add a job running `echo <name>` after `deps`.
    pub fn job(self, name: &str, deps: &[&str]) -> Self {
        self.with_job(shell_job(name, &format!("echo {name}"), deps))
    }

    pub fn with_job(mut self, job: Job) -> Self {
        self.workflow
            .add_job(job)
            .expect("WorkflowBuilder: duplicate job name");
        self
    }

    pub fn build(self) -> Workflow {
        self.workflow
    }
}
