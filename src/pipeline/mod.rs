// src/pipeline/mod.rs

//! Standard post-processing job chain.
//!
//! The record that knows where a sample's curated assembly lives is not part
//! of this crate; callers hand over a working directory and a file stem and
//! get back the jobs, ready to add to a [`Workflow`].
//!
//! ```text
//! scrub_assembly -> trim_Ns -> clip_regions
//! ```

use std::path::{Path, PathBuf};

use crate::config::ConfigFile;
use crate::dag::{Job, JobCommand, Workflow};
use crate::errors::ValidationError;

pub const SCRUB_ASSEMBLY: &str = "scrub_assembly";
pub const TRIM_NS: &str = "trim_Ns";
pub const CLIP_REGIONS: &str = "clip_regions";

/// File names derived from a working directory and an assembly stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLayout {
    working_dir: PathBuf,
    stem: String,
}

impl PathLayout {
    pub fn new(working_dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            working_dir: working_dir.into(),
            stem: stem.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn primary(&self, suffix: &str) -> PathBuf {
        self.working_dir
            .join(format!("{}.primary.{suffix}", self.stem))
    }

    /// Curated assembly handed over for post-processing.
    pub fn input_fasta(&self) -> PathBuf {
        self.primary("curated.fa")
    }

    /// Assembly after short contigs are scrubbed.
    pub fn untrimmed_fasta(&self) -> PathBuf {
        self.primary("untrimmed.fa")
    }

    /// Report of N-runs to trim.
    pub fn trim_report(&self) -> PathBuf {
        self.primary("trim_Ns.out")
    }

    pub fn final_fasta(&self) -> PathBuf {
        self.primary("final.fa")
    }
}

fn script_command(scripts_dir: &Path, script: &str, args: &[String]) -> JobCommand {
    let mut argv = vec![
        "python".to_string(),
        scripts_dir.join(script).display().to_string(),
    ];
    argv.extend(args.iter().cloned());
    JobCommand::Argv(argv)
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

/// Build the three-step chain for `layout`, with scripts and resources taken
/// from `cfg`.
pub fn post_processing_jobs(layout: &PathLayout, cfg: &ConfigFile) -> Vec<Job> {
    let scripts = &cfg.paths.scripts_dir;
    let input = layout.input_fasta();
    let untrimmed = layout.untrimmed_fasta();
    let trim_out = layout.trim_report();
    let final_fa = layout.final_fasta();

    let scrub = Job::new(SCRUB_ASSEMBLY)
        .with_command(script_command(
            scripts,
            "scrub_short_contigs.py",
            &[
                "--input".to_string(),
                path_arg(&input),
                "--output".to_string(),
                path_arg(&untrimmed),
            ],
        ))
        .with_resources(cfg.resources_for(SCRUB_ASSEMBLY))
        .input(input)
        .output(untrimmed.clone());

    let trim = Job::new(TRIM_NS)
        .with_command(script_command(
            scripts,
            "trim_Ns.py",
            &[path_arg(&untrimmed), path_arg(&trim_out)],
        ))
        .with_resources(cfg.resources_for(TRIM_NS))
        .after(SCRUB_ASSEMBLY)
        .input(untrimmed.clone())
        .output(trim_out.clone());

    let clip = Job::new(CLIP_REGIONS)
        .with_command(script_command(
            scripts,
            "clip_regions_DNAnexus.py",
            &[path_arg(&untrimmed), path_arg(&trim_out), path_arg(&final_fa)],
        ))
        .with_resources(cfg.resources_for(CLIP_REGIONS))
        .after(TRIM_NS)
        .input(untrimmed)
        .input(trim_out)
        .output(final_fa);

    vec![scrub, trim, clip]
}

/// Add the post-processing chain to `workflow`.
pub fn add_post_processing_jobs(
    workflow: &mut Workflow,
    layout: &PathLayout,
    cfg: &ConfigFile,
) -> Result<(), ValidationError> {
    for job in post_processing_jobs(layout, cfg) {
        workflow.add_job(job)?;
    }
    Ok(())
}
