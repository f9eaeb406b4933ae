// tests/cli_run.rs

use std::path::PathBuf;

use batchdag::cli::{CliArgs, LogLevel};
use batchdag::config::ConfigFile;
use batchdag::logging::resolve_level;
use batchdag::pipeline::{CLIP_REGIONS, SCRUB_ASSEMBLY, TRIM_NS};
use batchdag::types::ExecutorKind;
use batchdag::{ERROR_MARKER_FILE, build_workflow, load_config, run};
use batchdag_test_utils::{init_tracing, with_timeout};
use clap::Parser;

fn write_config(dir: &std::path::Path, contents: &str) -> PathBuf {
    let path = dir.join("Batchdag.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn cli_flags_parse() {
    let args = CliArgs::try_parse_from([
        "batchdag",
        "--config",
        "conf/Batchdag.toml",
        "--local",
        "--memory-multiplier",
        "1.5",
        "--working-dir",
        "/w",
        "--stem",
        "s.1",
        "--log-level",
        "debug",
        "--dry-run",
    ])
    .unwrap();

    assert_eq!(args.config, Some(PathBuf::from("conf/Batchdag.toml")));
    assert!(args.local);
    assert_eq!(args.memory_multiplier, Some(1.5));
    assert_eq!(args.working_dir, Some(PathBuf::from("/w")));
    assert_eq!(args.stem.as_deref(), Some("s.1"));
    assert_eq!(args.log_level, Some(LogLevel::Debug));
    assert!(args.dry_run);
    assert!(!args.check_env);
}

#[test]
fn log_level_priority() {
    use tracing::Level;
    assert_eq!(
        resolve_level(Some(LogLevel::Warn), Some("trace"), Some("debug")),
        Level::WARN
    );
    assert_eq!(resolve_level(None, Some("trace"), Some("debug")), Level::TRACE);
    assert_eq!(resolve_level(None, Some("bogus"), Some("debug")), Level::DEBUG);
    assert_eq!(resolve_level(None, None, None), Level::INFO);
}

#[test]
fn cli_overrides_apply_to_loaded_config() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_config(tmp.path(), "[config]\nexecutor = \"lsf\"\n");

    let args = CliArgs {
        config: Some(path),
        local: true,
        memory_multiplier: Some(3.0),
        ..CliArgs::default()
    };
    let cfg = load_config(&args).unwrap();

    assert_eq!(cfg.config.executor, ExecutorKind::Local);
    assert_eq!(cfg.resources_for(SCRUB_ASSEMBLY).mem_mb, Some(15000));

    let bad = CliArgs {
        memory_multiplier: Some(-1.0),
        ..args
    };
    assert!(load_config(&bad).is_err());
}

#[test]
fn template_needs_working_dir_and_stem() {
    let cfg = ConfigFile::default();

    assert!(build_workflow(&CliArgs::default(), &cfg).is_err());

    let args = CliArgs {
        working_dir: Some(PathBuf::from("/w")),
        stem: Some("s".to_string()),
        run_name: Some("TICKET-42".to_string()),
        ..CliArgs::default()
    };
    let wf = build_workflow(&args, &cfg).unwrap();
    assert_eq!(wf.label(), "TICKET-42");
    let names: Vec<&str> = wf.jobs().map(|j| j.name.as_str()).collect();
    assert_eq!(names, vec![SCRUB_ASSEMBLY, TRIM_NS, CLIP_REGIONS]);
}

#[tokio::test]
async fn dry_run_executes_nothing() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let touched = tmp.path().join("touched");
    let path = write_config(
        tmp.path(),
        &format!("[job.A]\ncommand = \"touch {}\"\n", touched.display()),
    );

    let args = CliArgs {
        config: Some(path),
        dry_run: true,
        ..CliArgs::default()
    };
    let cfg = load_config(&args).unwrap();

    assert!(with_timeout(run(args, cfg)).await.unwrap());
    assert!(!touched.exists());
}

#[tokio::test]
async fn local_run_succeeds_and_clears_marker() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    let marker = dir.join(ERROR_MARKER_FILE);
    std::fs::write(&marker, "stale failure\n").unwrap();

    let path = write_config(
        dir,
        &format!(
            r#"
[config]
executor = "local"

[job.first]
command = "echo one > {dir}/one.txt"
outputs = ["{dir}/one.txt"]

[job.second]
command = "cat {dir}/one.txt > {dir}/two.txt"
after = ["first"]
inputs = ["{dir}/one.txt"]
"#,
            dir = dir.display()
        ),
    );

    let args = CliArgs {
        config: Some(path),
        working_dir: Some(dir.to_path_buf()),
        ..CliArgs::default()
    };
    let cfg = load_config(&args).unwrap();

    assert!(with_timeout(run(args, cfg)).await.unwrap());
    assert_eq!(std::fs::read_to_string(dir.join("two.txt")).unwrap(), "one\n");
    assert!(!marker.exists());
}

#[tokio::test]
async fn local_run_failure_writes_marker() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();

    let path = write_config(
        dir,
        "[config]\nexecutor = \"local\"\n\n[job.broken]\ncommand = \"echo nope >&2; exit 2\"\n",
    );
    let args = CliArgs {
        config: Some(path),
        working_dir: Some(dir.to_path_buf()),
        run_name: Some("sample-7".to_string()),
        ..CliArgs::default()
    };
    let cfg = load_config(&args).unwrap();

    assert!(!with_timeout(run(args, cfg)).await.unwrap());

    let diagnostic = std::fs::read_to_string(dir.join(ERROR_MARKER_FILE)).unwrap();
    assert!(diagnostic.starts_with("workflow 'sample-7' failed"), "{diagnostic}");
    assert!(diagnostic.contains("broken"), "{diagnostic}");
    assert!(diagnostic.contains("nope"), "{diagnostic}");
}

#[tokio::test]
async fn cyclic_config_is_an_error() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let path = write_config(
        tmp.path(),
        "[config]\nexecutor = \"local\"\n\n[job.a]\ncommand = \"true\"\nafter = [\"b\"]\n\n[job.b]\ncommand = \"true\"\nafter = [\"a\"]\n",
    );
    let args = CliArgs {
        config: Some(path),
        working_dir: Some(tmp.path().to_path_buf()),
        ..CliArgs::default()
    };
    let cfg = load_config(&args).unwrap();

    let err = with_timeout(run(args, cfg)).await.unwrap_err();
    assert!(err.to_string().contains("cycle"), "{err}");
}

#[tokio::test]
async fn dry_run_rejects_unknown_dependency() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let path = write_config(
        tmp.path(),
        "[job.A]\ncommand = \"true\"\nafter = [\"nope\"]\n",
    );
    let args = CliArgs {
        config: Some(path),
        dry_run: true,
        ..CliArgs::default()
    };
    let cfg = load_config(&args).unwrap();

    let err = with_timeout(run(args, cfg)).await.unwrap_err();
    assert!(err.to_string().contains("unknown job 'nope'"), "{err}");
}
