// src/engine/observer.rs

//! End-of-run notifications.
//!
//! The driver calls every registered [`RunObserver`] exactly once per run:
//! `on_success` when everything completed, `on_failure` with an aggregated
//! diagnostic otherwise (including validation failures).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::engine::driver::RunReport;
use crate::fs::{FileSystem, RealFileSystem};

pub trait RunObserver: Send {
    fn on_success(&mut self, report: &RunReport);
    fn on_failure(&mut self, diagnostic: &str);
}

/// Writes the outcome to the log and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl RunObserver for LoggingObserver {
    fn on_success(&mut self, report: &RunReport) {
        info!(
            workflow = %report.workflow,
            jobs = report.submitted.len(),
            "pipeline completed successfully"
        );
    }

    fn on_failure(&mut self, diagnostic: &str) {
        for line in diagnostic.lines() {
            error!("{}", line);
        }
    }
}

/// Keeps an error marker file in sync with the last run.
///
/// On failure the diagnostic is written to the marker; on success any marker
/// left by an earlier failed run is removed.
#[derive(Debug, Clone)]
pub struct ErrorMarkerObserver {
    marker: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl ErrorMarkerObserver {
    pub fn new(marker: impl Into<PathBuf>) -> Self {
        Self::with_filesystem(marker, Arc::new(RealFileSystem))
    }

    pub fn with_filesystem(marker: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            marker: marker.into(),
            fs,
        }
    }

    pub fn marker(&self) -> &Path {
        &self.marker
    }
}

impl RunObserver for ErrorMarkerObserver {
    fn on_success(&mut self, _report: &RunReport) {
        if !self.fs.exists(&self.marker) {
            return;
        }
        match self.fs.remove_file(&self.marker) {
            Ok(()) => info!(marker = %self.marker.display(), "cleared error marker from previous run"),
            Err(err) => warn!(marker = %self.marker.display(), error = %err, "could not clear error marker"),
        }
    }

    fn on_failure(&mut self, diagnostic: &str) {
        let mut contents = diagnostic.to_string();
        contents.push('\n');
        if let Err(err) = self.fs.write(&self.marker, contents.as_bytes()) {
            warn!(marker = %self.marker.display(), error = %err, "could not write error marker");
        }
    }
}
