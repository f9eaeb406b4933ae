use std::str::FromStr;
use serde::Deserialize;

/// Which execution backend a run uses.
///
/// Chosen once, at construction time, from `[config].executor` or the
/// `--local` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    /// Run each job's command as a local subprocess, one at a time.
    Local,
    /// Submit jobs to an LSF cluster (`bsub` / `bjobs` / `bkill`).
    Lsf,
}

impl Default for ExecutorKind {
    fn default() -> Self {
        ExecutorKind::Lsf
    }
}

impl FromStr for ExecutorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(ExecutorKind::Local),
            "lsf" => Ok(ExecutorKind::Lsf),
            other => Err(format!(
                "invalid executor: {other} (expected \"local\" or \"lsf\")"
            )),
        }
    }
}

/// What the driver does when a job fails.
///
/// - `FailFast`: the first submission or execution failure ends the run.
///   Jobs that were already handed to the backend are left alone.
/// - `ContinueIndependent`: keep submitting jobs that do not depend on the
///   failed one, wait for everything outstanding, then report the failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    FailFast,
    #[serde(alias = "continue")]
    ContinueIndependent,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::FailFast
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail-fast" | "failfast" => Ok(FailurePolicy::FailFast),
            "continue" | "continue-independent" => Ok(FailurePolicy::ContinueIndependent),
            other => Err(format!(
                "invalid failure_policy: {other} (expected \"fail-fast\" or \"continue\")"
            )),
        }
    }
}
