// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{BatchdagError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::BatchdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_remote_config(cfg)?;
    validate_jobs(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    let section = &cfg.config;

    if !section.memory_multiplier.is_finite() || section.memory_multiplier <= 0.0 {
        return Err(BatchdagError::ConfigError(format!(
            "[config].memory_multiplier must be a positive number (got {})",
            section.memory_multiplier
        )));
    }

    if section.default_queue.trim().is_empty() {
        return Err(BatchdagError::ConfigError(
            "[config].default_queue must not be empty".to_string(),
        ));
    }

    if section.poll_interval_secs == 0 {
        return Err(BatchdagError::ConfigError(
            "[config].poll_interval_secs must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_remote_config(cfg: &RawConfigFile) -> Result<()> {
    let remote = &cfg.remote;
    for (key, value) in [
        ("submit_command", &remote.submit_command),
        ("status_command", &remote.status_command),
        ("kill_command", &remote.kill_command),
    ] {
        if value.trim().is_empty() {
            return Err(BatchdagError::ConfigError(format!(
                "[remote].{key} must not be empty"
            )));
        }
    }
    Ok(())
}

/// Per-job sanity only; graph structure (unknown `after` names, cycles) is
/// checked by `Workflow::validate` once the jobs are assembled.
fn validate_jobs(cfg: &RawConfigFile) -> Result<()> {
    for (name, job) in cfg.job.iter() {
        if job.command.is_blank() {
            return Err(BatchdagError::ConfigError(format!(
                "job '{name}' has an empty `command`"
            )));
        }
        if job.after.iter().any(|dep| dep == name) {
            return Err(BatchdagError::ConfigError(format!(
                "job '{name}' cannot depend on itself in `after`"
            )));
        }
    }
    Ok(())
}
