// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::dag::{Job, JobCommand, Resources};
use crate::types::{ExecutorKind, FailurePolicy};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// executor = "lsf"
/// default_queue = "normal"
/// poll_interval_secs = 30
/// failure_policy = "fail-fast"
/// memory_multiplier = 1.0
///
/// [paths]
/// scripts_dir = "pipeline/scripts"
/// logs_dir = "pipeline/logs"
///
/// [resources.scrub_assembly]
/// mem_mb = 5000
///
/// [job.A]
/// command = "echo A"
/// after = ["B"]
/// ```
///
/// All sections are optional and have reasonable defaults. This is the
/// unvalidated form; convert with `ConfigFile::try_from`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub logging: LoggingSection,

    #[serde(default)]
    pub remote: RemoteSection,

    /// Per-job resource overrides from `[resources.<job>]`, merged over the
    /// built-in defaults.
    #[serde(default)]
    pub resources: BTreeMap<String, Resources>,

    /// Explicit jobs from `[job.<name>]`.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,
}

/// Validated configuration.
///
/// Constructed via `TryFrom<RawConfigFile>` (see `config::validate`) or
/// [`ConfigFile::default`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub paths: PathsSection,
    pub logging: LoggingSection,
    pub remote: RemoteSection,
    pub resources: BTreeMap<String, Resources>,
    pub job: BTreeMap<String, JobConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        let mut resources = default_resources();
        for (name, overrides) in raw.resources {
            let merged = match resources.get(&name) {
                Some(base) => overrides.or(base),
                None => overrides,
            };
            resources.insert(name, merged);
        }

        Self {
            config: raw.config,
            paths: raw.paths,
            logging: raw.logging,
            remote: raw.remote,
            resources,
            job: raw.job,
        }
    }

    /// Resource request for a job name with the memory multiplier applied.
    /// Unknown names get an empty request.
    pub fn resources_for(&self, job: &str) -> Resources {
        self.resources
            .get(job)
            .cloned()
            .unwrap_or_default()
            .scaled(self.config.memory_multiplier)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.config.poll_interval_secs)
    }

    /// Build jobs from the `[job.<name>]` tables, in name order.
    ///
    /// Inline `mem_mb`/`queue` win over `[resources.<name>]`; the memory
    /// multiplier applies to whichever is used.
    pub fn configured_jobs(&self) -> Vec<Job> {
        self.job
            .iter()
            .map(|(name, jc)| {
                let inline = Resources {
                    mem_mb: jc.mem_mb,
                    queue: jc.queue.clone(),
                };
                let base = self.resources.get(name).cloned().unwrap_or_default();
                let resources = inline.or(&base).scaled(self.config.memory_multiplier);

                let mut job = Job::new(name.clone())
                    .with_command(jc.command.clone())
                    .with_resources(resources);
                for dep in &jc.after {
                    job = job.after(dep.clone());
                }
                for input in &jc.inputs {
                    job = job.input(input.clone());
                }
                for output in &jc.outputs {
                    job = job.output(output.clone());
                }
                job
            })
            .collect()
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"lsf"` (default) or `"local"`.
    #[serde(default)]
    pub executor: ExecutorKind,

    /// Queue for jobs that do not request one.
    #[serde(default = "default_queue")]
    pub default_queue: String,

    /// Seconds between remote status polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// `"fail-fast"` (default) or `"continue"`.
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Applied to every `mem_mb` request.
    #[serde(default = "default_memory_multiplier")]
    pub memory_multiplier: f64,
}

fn default_queue() -> String {
    "normal".to_string()
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_memory_multiplier() -> f64 {
    1.0
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            executor: ExecutorKind::default(),
            default_queue: default_queue(),
            poll_interval_secs: default_poll_interval_secs(),
            failure_policy: FailurePolicy::default(),
            memory_multiplier: default_memory_multiplier(),
        }
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Batch stdout/stderr files land here.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("pipeline/scripts")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("pipeline/logs")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            scripts_dir: default_scripts_dir(),
            output_dir: default_output_dir(),
            logs_dir: default_logs_dir(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSection {
    /// Level name (`error` .. `trace`); the CLI flag and `BATCHDAG_LOG` win.
    #[serde(default)]
    pub level: Option<String>,

    /// Also append logs to this file.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// `[remote]` section: program names for the batch CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSection {
    #[serde(default = "default_submit_command")]
    pub submit_command: String,

    #[serde(default = "default_status_command")]
    pub status_command: String,

    #[serde(default = "default_kill_command")]
    pub kill_command: String,
}

fn default_submit_command() -> String {
    "bsub".to_string()
}

fn default_status_command() -> String {
    "bjobs".to_string()
}

fn default_kill_command() -> String {
    "bkill".to_string()
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            submit_command: default_submit_command(),
            status_command: default_status_command(),
            kill_command: default_kill_command(),
        }
    }
}

/// `[job.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Shell string or argument vector.
    pub command: JobCommand,

    /// This job waits for every job listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Files that must exist before the job can run.
    #[serde(default)]
    pub inputs: Vec<PathBuf>,

    /// Files the job is expected to produce.
    #[serde(default)]
    pub outputs: Vec<PathBuf>,

    #[serde(default)]
    pub mem_mb: Option<u64>,

    #[serde(default)]
    pub queue: Option<String>,
}

/// Memory requests of the standard post-processing steps.
fn default_resources() -> BTreeMap<String, Resources> {
    [
        ("scrub_assembly", 5000),
        ("trim_Ns", 5000),
        ("clip_regions", 5000),
        ("sum_chrs", 10000),
        ("gather_vgp_stats", 10000),
        ("gfastats", 10000),
    ]
    .into_iter()
    .map(|(name, mb)| {
        (
            name.to_string(),
            Resources {
                mem_mb: Some(mb),
                queue: None,
            },
        )
    })
    .collect()
}
