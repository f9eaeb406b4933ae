// src/envcheck.rs

//! Pre-flight checks for `--check-env`.
//!
//! Everything is looked up through [`FileSystem`], including the `PATH`
//! search, so the checks run against a mock in tests.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use crate::config::ConfigFile;
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::ExecutorKind;

/// Scripts the post-processing chain invokes.
pub const POST_PROCESSING_SCRIPTS: [&str; 3] = [
    "scrub_short_contigs.py",
    "trim_Ns.py",
    "clip_regions_DNAnexus.py",
];

/// Result of one environment check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvReport {
    pub missing_executables: Vec<String>,
    pub missing_scripts: Vec<PathBuf>,
    pub missing_dirs: Vec<PathBuf>,
}

impl EnvReport {
    pub fn is_ok(&self) -> bool {
        self.missing_executables.is_empty()
            && self.missing_scripts.is_empty()
            && self.missing_dirs.is_empty()
    }

    /// One line per problem.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for exe in &self.missing_executables {
            issues.push(format!("executable not found on PATH: {exe}"));
        }
        for script in &self.missing_scripts {
            issues.push(format!("script not found: {}", script.display()));
        }
        for dir in &self.missing_dirs {
            issues.push(format!("directory not found: {}", dir.display()));
        }
        issues
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentChecker {
    fs: Arc<dyn FileSystem>,
    search_path: Option<OsString>,
    executables: Vec<String>,
    scripts: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl EnvironmentChecker {
    /// Requirements implied by `cfg`. Batch commands are only required for
    /// the LSF executor; the scripts only when the post-processing chain
    /// is in use.
    pub fn from_config(cfg: &ConfigFile, post_processing: bool) -> Self {
        let mut executables = Vec::new();
        if cfg.config.executor == ExecutorKind::Lsf {
            executables.push(cfg.remote.submit_command.clone());
            executables.push(cfg.remote.status_command.clone());
        }

        let mut scripts = Vec::new();
        if post_processing {
            executables.push("python".to_string());
            scripts.extend(
                POST_PROCESSING_SCRIPTS
                    .iter()
                    .map(|s| cfg.paths.scripts_dir.join(s)),
            );
        }

        Self {
            fs: Arc::new(RealFileSystem),
            search_path: std::env::var_os("PATH"),
            executables,
            scripts,
            dirs: vec![cfg.paths.scripts_dir.clone(), cfg.paths.logs_dir.clone()],
        }
    }

    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Override the `PATH` value used to locate executables.
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    pub fn executables(&self) -> &[String] {
        &self.executables
    }

    pub fn check(&self) -> EnvReport {
        EnvReport {
            missing_executables: self
                .executables
                .iter()
                .filter(|exe| !self.on_path(exe))
                .cloned()
                .collect(),
            missing_scripts: self
                .scripts
                .iter()
                .filter(|script| !self.fs.is_file(script))
                .cloned()
                .collect(),
            missing_dirs: self
                .dirs
                .iter()
                .filter(|dir| !self.fs.is_dir(dir))
                .cloned()
                .collect(),
        }
    }

    /// Run the checks and log every issue. Returns the report either way.
    pub fn check_and_log(&self) -> EnvReport {
        let report = self.check();
        if report.is_ok() {
            info!(
                executables = ?self.executables,
                "environment check passed"
            );
        } else {
            for issue in report.issues() {
                error!("{}", issue);
            }
        }
        report
    }

    fn on_path(&self, executable: &str) -> bool {
        // A name with a separator is a path, not something to search for.
        if executable.contains(std::path::MAIN_SEPARATOR) {
            return self.fs.is_executable(std::path::Path::new(executable));
        }
        let Some(search_path) = &self.search_path else {
            return false;
        };
        std::env::split_paths(search_path).any(|dir| self.fs.is_executable(&dir.join(executable)))
    }
}
