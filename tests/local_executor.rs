// tests/local_executor.rs
//
// These tests spawn real `sh` processes inside a temporary directory.

use std::sync::Arc;

use batchdag::dag::{Job, JobStatus, Workflow};
use batchdag::engine::{Driver, DriverOptions, DriverState};
use batchdag::errors::ExecutorError;
use batchdag::exec::{Executor, LocalExecutor, ProcessRunner, Submission};
use batchdag::fs::RealFileSystem;
use batchdag_test_utils::{init_tracing, with_timeout};

#[tokio::test]
async fn successful_command_finishes_during_submit() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let mut exec = LocalExecutor::with_runner(ProcessRunner::in_dir(tmp.path()));

    let job = Job::new("write").with_command("echo hello > out.txt");
    let result = with_timeout(exec.submit(&job)).await.unwrap();

    assert_eq!(result, Submission::Finished);
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("out.txt")).unwrap(),
        "hello\n"
    );
    assert!(exec.outstanding().is_empty());
    assert!(exec.monitor().await.is_empty());
}

#[tokio::test]
async fn non_zero_exit_is_an_execution_error_with_message() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let mut exec = LocalExecutor::with_runner(ProcessRunner::in_dir(tmp.path()));

    let job = Job::new("bad").with_command("echo 'disk on fire' >&2; exit 3");
    let err = with_timeout(exec.submit(&job)).await.unwrap_err();

    match err {
        ExecutorError::Execution {
            job,
            message,
            exit_code,
        } => {
            assert_eq!(job, "bad");
            assert_eq!(exit_code, Some(3));
            assert!(message.contains("exited with code 3"), "{message}");
            assert!(message.contains("disk on fire"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_program_is_an_execution_error() {
    init_tracing();
    let mut exec = LocalExecutor::new();
    let job = Job::new("ghost").with_command(vec![
        "batchdag-definitely-not-a-real-program".to_string(),
    ]);

    let err = with_timeout(exec.submit(&job)).await.unwrap_err();
    assert!(matches!(err, ExecutorError::Execution { exit_code: None, .. }));
}

#[tokio::test]
async fn same_job_cannot_be_submitted_twice() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let mut exec = LocalExecutor::with_runner(ProcessRunner::in_dir(tmp.path()));
    let job = Job::new("once").with_command("true");

    with_timeout(exec.submit(&job)).await.unwrap();
    let err = with_timeout(exec.submit(&job)).await.unwrap_err();
    assert_eq!(
        err,
        ExecutorError::AlreadySubmitted {
            job: "once".to_string()
        }
    );
}

#[tokio::test]
async fn chain_runs_in_dependency_order_and_passes_files() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();

    let mut wf = Workflow::with_filesystem("chain", Arc::new(RealFileSystem));
    wf.add_job(
        Job::new("A")
            .with_command("echo a > a.txt")
            .output(dir.join("a.txt")),
    )
    .unwrap();
    wf.add_job(
        Job::new("B")
            .with_command("cat a.txt > b.txt; echo b >> b.txt")
            .after("A")
            .input(dir.join("a.txt")),
    )
    .unwrap();

    let exec = LocalExecutor::with_runner(ProcessRunner::in_dir(dir));
    let mut driver = Driver::new(wf, exec, DriverOptions::default());
    let report = with_timeout(driver.run()).await.unwrap();

    assert!(report.is_success(), "{report}");
    assert_eq!(report.submitted, vec!["A", "B"]);
    assert_eq!(std::fs::read_to_string(dir.join("b.txt")).unwrap(), "a\nb\n");
    assert_eq!(driver.state(), DriverState::Succeeded);
}

#[tokio::test]
async fn failing_job_fails_the_run_and_skips_dependents() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();

    let mut wf = Workflow::new("fail");
    wf.add_job(Job::new("A").with_command("exit 1")).unwrap();
    wf.add_job(Job::new("B").with_command("touch b.txt").after("A"))
        .unwrap();

    let exec = LocalExecutor::with_runner(ProcessRunner::in_dir(tmp.path()));
    let mut driver = Driver::new(wf, exec, DriverOptions::default());
    let report = with_timeout(driver.run()).await.unwrap();

    assert_eq!(report.state(), DriverState::Failed);
    assert_eq!(report.failed_jobs(), vec!["A"]);
    assert!(!report.failures()[0].message.is_empty());
    assert_eq!(driver.workflow().job("A").unwrap().status(), JobStatus::Failed);
    assert_eq!(driver.workflow().job("B").unwrap().status(), JobStatus::Pending);
    assert!(!tmp.path().join("b.txt").exists());
}
