// tests/config_loading.rs

use std::path::PathBuf;
use std::time::Duration;

use batchdag::config::{ConfigFile, load_and_validate, load_or_default};
use batchdag::dag::{JobCommand, Resources};
use batchdag::errors::BatchdagError;
use batchdag::types::{ExecutorKind, FailurePolicy};
use batchdag_test_utils::builders::{ConfigFileBuilder, JobConfigBuilder};

fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Batchdag.toml");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn missing_config_path_uses_defaults() {
    let cfg = load_or_default(None).unwrap();

    assert_eq!(cfg.config.executor, ExecutorKind::Lsf);
    assert_eq!(cfg.config.default_queue, "normal");
    assert_eq!(cfg.poll_interval(), Duration::from_secs(30));
    assert_eq!(cfg.config.failure_policy, FailurePolicy::FailFast);
    assert_eq!(cfg.remote.submit_command, "bsub");
    assert_eq!(cfg.paths.logs_dir, PathBuf::from("pipeline/logs"));
    assert!(cfg.job.is_empty());
}

#[test]
fn built_in_resource_defaults() {
    let cfg = ConfigFile::default();
    assert_eq!(cfg.resources_for("scrub_assembly").mem_mb, Some(5000));
    assert_eq!(cfg.resources_for("trim_Ns").mem_mb, Some(5000));
    assert_eq!(cfg.resources_for("clip_regions").mem_mb, Some(5000));
    assert_eq!(cfg.resources_for("gfastats").mem_mb, Some(10000));
    assert_eq!(cfg.resources_for("sum_chrs").mem_mb, Some(10000));
    assert_eq!(cfg.resources_for("unknown"), Resources::default());
}

#[test]
fn full_config_file_is_parsed() {
    let (_dir, path) = write_config(
        r#"
[config]
executor = "local"
default_queue = "short"
poll_interval_secs = 5
failure_policy = "continue"
memory_multiplier = 1.5

[paths]
scripts_dir = "/opt/pipeline/scripts"

[logging]
level = "debug"

[resources.scrub_assembly]
queue = "long"

[job.fetch]
command = "curl -o in.fa http://example.invalid/in.fa"
outputs = ["in.fa"]

[job.count]
command = ["python", "count.py", "in.fa"]
after = ["fetch"]
inputs = ["in.fa"]
mem_mb = 200
"#,
    );

    let cfg = load_and_validate(&path).unwrap();

    assert_eq!(cfg.config.executor, ExecutorKind::Local);
    assert_eq!(cfg.config.default_queue, "short");
    assert_eq!(cfg.poll_interval(), Duration::from_secs(5));
    assert_eq!(cfg.config.failure_policy, FailurePolicy::ContinueIndependent);
    assert_eq!(cfg.paths.scripts_dir, PathBuf::from("/opt/pipeline/scripts"));
    assert_eq!(cfg.paths.output_dir, PathBuf::from("output"));
    assert_eq!(cfg.logging.level.as_deref(), Some("debug"));

    // Override keeps the built-in memory and adds a queue; multiplier applies.
    assert_eq!(
        cfg.resources_for("scrub_assembly"),
        Resources {
            mem_mb: Some(7500),
            queue: Some("long".to_string()),
        }
    );

    let jobs = cfg.configured_jobs();
    let names: Vec<&str> = jobs.iter().map(|j| j.name.as_str()).collect();
    assert_eq!(names, vec!["count", "fetch"]);

    let count = &jobs[0];
    assert_eq!(
        count.command,
        Some(JobCommand::Argv(vec![
            "python".to_string(),
            "count.py".to_string(),
            "in.fa".to_string()
        ]))
    );
    assert_eq!(count.dependencies, vec!["fetch"]);
    assert_eq!(count.input_files, vec![PathBuf::from("in.fa")]);
    assert_eq!(count.resources.mem_mb, Some(300));
    assert_eq!(jobs[1].output_files, vec![PathBuf::from("in.fa")]);
}

#[test]
fn inline_job_resources_win_over_resource_table() {
    let cfg = ConfigFileBuilder::new()
        .with_resources("align", Some(1000), Some("long"))
        .with_job("align", JobConfigBuilder::new("bwa mem").mem_mb(64).build())
        .memory_multiplier(2.0)
        .build();

    let jobs = cfg.configured_jobs();
    assert_eq!(
        jobs[0].resources,
        Resources {
            mem_mb: Some(128),
            queue: Some("long".to_string()),
        }
    );
}

#[test]
fn memory_multiplier_truncates_to_whole_megabytes() {
    let cfg = ConfigFileBuilder::new()
        .with_resources("odd", Some(333), None)
        .memory_multiplier(1.5)
        .build();
    assert_eq!(cfg.resources_for("odd").mem_mb, Some(499));
    assert_eq!(cfg.resources_for("gfastats").mem_mb, Some(15000));
}

#[test]
fn invalid_values_are_rejected() {
    let bad_multiplier = ConfigFileBuilder::new().memory_multiplier(0.0).raw();
    assert!(matches!(
        ConfigFile::try_from(bad_multiplier),
        Err(BatchdagError::ConfigError(msg)) if msg.contains("memory_multiplier")
    ));

    let mut zero_poll = ConfigFileBuilder::new().raw();
    zero_poll.config.poll_interval_secs = 0;
    assert!(ConfigFile::try_from(zero_poll).is_err());

    let mut empty_queue = ConfigFileBuilder::new().raw();
    empty_queue.config.default_queue = "  ".to_string();
    assert!(ConfigFile::try_from(empty_queue).is_err());

    let blank = ConfigFileBuilder::new()
        .with_job("A", JobConfigBuilder::new("   ").build())
        .raw();
    assert!(matches!(
        ConfigFile::try_from(blank),
        Err(BatchdagError::ConfigError(msg)) if msg.contains("job 'A'")
    ));

    let self_dep = ConfigFileBuilder::new()
        .with_job("A", JobConfigBuilder::new("echo").after("A").build())
        .raw();
    assert!(ConfigFile::try_from(self_dep).is_err());
}

#[test]
fn unknown_enum_values_are_toml_errors() {
    let (_dir, path) = write_config("[config]\nexecutor = \"slurm\"\n");
    assert!(matches!(
        load_and_validate(&path),
        Err(BatchdagError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_and_validate(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, BatchdagError::IoError(_)));
}

#[test]
fn enum_values_parse_from_strings() {
    assert_eq!("LSF".parse::<ExecutorKind>(), Ok(ExecutorKind::Lsf));
    assert_eq!("local".parse::<ExecutorKind>(), Ok(ExecutorKind::Local));
    assert!("pbs".parse::<ExecutorKind>().is_err());
    assert_eq!(
        "continue".parse::<FailurePolicy>(),
        Ok(FailurePolicy::ContinueIndependent)
    );
    assert_eq!("fail-fast".parse::<FailurePolicy>(), Ok(FailurePolicy::FailFast));
}
