// tests/workflow_graph.rs

use batchdag::dag::{Job, JobStatus, Workflow, execution_order};
use batchdag::errors::{BatchdagError, ValidationError};
use batchdag_test_utils::builders::{WorkflowBuilder, shell_job};

fn names(jobs: Vec<&Job>) -> Vec<String> {
    jobs.into_iter().map(|j| j.name.clone()).collect()
}

/// A -> {B, C}, {B, C} -> D
fn diamond() -> Workflow {
    WorkflowBuilder::new("diamond")
        .job("A", &[])
        .job("B", &["A"])
        .job("C", &["A"])
        .job("D", &["B", "C"])
        .build()
}

#[test]
fn duplicate_job_name_is_rejected() {
    let mut wf = Workflow::new("dup");
    wf.add_job(shell_job("A", "echo 1", &[])).unwrap();

    let err = wf.add_job(shell_job("A", "echo 2", &[])).unwrap_err();
    assert_eq!(err, ValidationError::DuplicateJob("A".to_string()));
    assert_eq!(wf.len(), 1);
    assert_eq!(
        wf.job("A").unwrap().command.as_ref().unwrap().to_string(),
        "echo 1"
    );
}

#[test]
fn empty_workflow_is_valid_and_complete() {
    let wf = Workflow::new("empty");
    assert!(wf.validate().is_ok());
    assert!(wf.get_ready_jobs().is_empty());
    assert!(wf.all_completed());
}

#[test]
fn job_without_command_fails_validation() {
    let mut wf = Workflow::new("nocmd");
    wf.add_job(Job::new("A")).unwrap();

    assert_eq!(
        wf.validate().unwrap_err(),
        ValidationError::MissingCommand("A".to_string())
    );
}

#[test]
fn unknown_dependency_fails_validation() {
    let wf = WorkflowBuilder::new("unknown").job("A", &["ghost"]).build();

    assert_eq!(
        wf.validate().unwrap_err(),
        ValidationError::UnknownDependency {
            job: "A".to_string(),
            dependency: "ghost".to_string(),
        }
    );
}

#[test]
fn two_node_cycle_reports_closed_walk() {
    let wf = WorkflowBuilder::new("cycle")
        .job("A", &["B"])
        .job("B", &["A"])
        .build();

    let Err(ValidationError::Cycle(walk)) = wf.validate() else {
        panic!("expected a cycle error");
    };
    assert_eq!(walk, vec!["A", "B", "A"]);
}

#[test]
fn cycle_walk_follows_real_dependency_edges() {
    // Entry job X leads into the cycle B -> C -> D -> B.
    let wf = WorkflowBuilder::new("cycle")
        .job("X", &["B"])
        .job("B", &["C"])
        .job("C", &["D"])
        .job("D", &["B"])
        .build();

    let Err(ValidationError::Cycle(walk)) = wf.validate() else {
        panic!("expected a cycle error");
    };

    assert_eq!(walk.first(), walk.last());
    assert!(!walk.contains(&"X".to_string()), "walk must not include the entry path: {walk:?}");
    for pair in walk.windows(2) {
        let job = wf.job(&pair[0]).unwrap();
        assert!(
            job.dependencies.contains(&pair[1]),
            "{} does not depend on {}",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn self_dependency_is_a_cycle() {
    let wf = WorkflowBuilder::new("self").job("A", &["A"]).build();
    assert_eq!(
        wf.validate().unwrap_err(),
        ValidationError::Cycle(vec!["A".to_string(), "A".to_string()])
    );
}

#[test]
fn very_deep_chain_validates_without_recursion() {
    const DEPTH: usize = 50_000;
    let name = |i: usize| format!("j{i}");

    let mut chain = WorkflowBuilder::new("deep").job(&name(0), &[]);
    for i in 1..DEPTH {
        chain = chain.job(&name(i), &[&name(i - 1)]);
    }
    assert!(chain.build().validate().is_ok());

    // Same chain, closed back onto its tail.
    let mut ring = WorkflowBuilder::new("deep-ring").job(&name(0), &[&name(DEPTH - 1)]);
    for i in 1..DEPTH {
        ring = ring.job(&name(i), &[&name(i - 1)]);
    }
    let Err(ValidationError::Cycle(walk)) = ring.build().validate() else {
        panic!("expected a cycle error");
    };
    assert_eq!(walk.len(), DEPTH + 1);
    assert_eq!(walk.first(), walk.last());
}

#[test]
fn only_roots_are_ready_initially() {
    let wf = diamond();
    assert!(wf.validate().is_ok());
    assert_eq!(names(wf.get_ready_jobs()), vec!["A"]);
}

#[test]
fn get_ready_jobs_is_idempotent() {
    let wf = diamond();
    assert_eq!(names(wf.get_ready_jobs()), names(wf.get_ready_jobs()));
}

#[test]
fn completing_dependencies_unblocks_dependents() {
    let mut wf = diamond();

    wf.update_status("A", JobStatus::Running, None).unwrap();
    assert!(wf.get_ready_jobs().is_empty(), "running jobs are not ready");

    wf.update_status("A", JobStatus::Completed, None).unwrap();
    assert_eq!(names(wf.get_ready_jobs()), vec!["B", "C"]);

    wf.update_status("B", JobStatus::Running, None).unwrap();
    wf.update_status("B", JobStatus::Completed, None).unwrap();
    assert_eq!(names(wf.get_ready_jobs()), vec!["C"], "D still waits for C");

    wf.update_status("C", JobStatus::Running, None).unwrap();
    wf.update_status("C", JobStatus::Completed, None).unwrap();
    assert_eq!(names(wf.get_ready_jobs()), vec!["D"]);
}

#[test]
fn failed_dependency_never_unblocks() {
    let mut wf = diamond();
    wf.update_status("A", JobStatus::Running, None).unwrap();
    wf.update_status("A", JobStatus::Failed, Some("boom".into())).unwrap();

    assert!(wf.get_ready_jobs().is_empty());
    let b = wf.job("B").unwrap();
    assert_eq!(
        wf.unmet_requirements(b),
        vec!["dependency 'A' is failed".to_string()]
    );
}

#[test]
fn failed_status_always_carries_a_message() {
    let mut wf = diamond();
    wf.update_status("A", JobStatus::Running, None).unwrap();
    wf.update_status("A", JobStatus::Failed, None).unwrap();

    let a = wf.job("A").unwrap();
    assert_eq!(a.status(), JobStatus::Failed);
    assert!(!a.error().unwrap_or_default().is_empty());

    let failures = wf.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].job, "A");
}

#[test]
fn illegal_transitions_are_rejected() {
    let mut wf = diamond();

    let err = wf
        .update_status("A", JobStatus::Completed, None)
        .unwrap_err();
    assert!(matches!(
        err,
        BatchdagError::InvalidTransition {
            from: JobStatus::Pending,
            to: JobStatus::Completed,
            ..
        }
    ));
    assert_eq!(wf.job("A").unwrap().status(), JobStatus::Pending);

    wf.update_status("A", JobStatus::Running, None).unwrap();
    wf.update_status("A", JobStatus::Completed, None).unwrap();
    assert!(
        wf.update_status("A", JobStatus::Running, None).is_err(),
        "terminal states are final"
    );
}

#[test]
fn unknown_job_status_update_is_an_error() {
    let mut wf = diamond();
    let err = wf.update_status("nope", JobStatus::Running, None).unwrap_err();
    assert!(matches!(err, BatchdagError::UnknownJob(name) if name == "nope"));
}

#[test]
fn execution_order_respects_dependencies() {
    let wf = diamond();
    let order = execution_order(&wf).unwrap();
    assert_eq!(order.len(), 4);

    let pos = |n: &str| order.iter().position(|o| o == n).unwrap();
    assert!(pos("A") < pos("B"));
    assert!(pos("A") < pos("C"));
    assert!(pos("B") < pos("D"));
    assert!(pos("C") < pos("D"));
}

#[test]
fn execution_order_reports_cycles() {
    let wf = WorkflowBuilder::new("cycle")
        .job("A", &["B"])
        .job("B", &["A"])
        .build();

    assert!(matches!(
        execution_order(&wf),
        Err(ValidationError::Cycle(_))
    ));
}
