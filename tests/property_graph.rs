// tests/property_graph.rs

use std::collections::{BTreeSet, HashSet};

use batchdag::dag::{JobStatus, Workflow, execution_order};
use batchdag::errors::ValidationError;
use batchdag_test_utils::builders::shell_job;
use proptest::prelude::*;

/// Dependency lists for `n` jobs where job `i` only depends on jobs `< i`,
/// so the graph is acyclic by construction.
fn acyclic_deps(max_jobs: usize) -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1..=max_jobs).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), n).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        if i == 0 {
                            BTreeSet::new()
                        } else {
                            picks.into_iter().map(|p| p % i).collect()
                        }
                    })
                    .collect()
            },
        )
    })
}

fn name(i: usize) -> String {
    format!("job_{i}")
}

fn workflow_from(deps: &[BTreeSet<usize>]) -> Workflow {
    let mut wf = Workflow::new("prop");
    for (i, ds) in deps.iter().enumerate() {
        let dep_names: Vec<String> = ds.iter().map(|&d| name(d)).collect();
        let dep_refs: Vec<&str> = dep_names.iter().map(String::as_str).collect();
        wf.add_job(shell_job(&name(i), "true", &dep_refs)).unwrap();
    }
    wf
}

proptest! {
    #[test]
    fn acyclic_graphs_validate(deps in acyclic_deps(12)) {
        let wf = workflow_from(&deps);
        prop_assert!(wf.validate().is_ok());

        let order = execution_order(&wf).unwrap();
        prop_assert_eq!(order.len(), deps.len());
        for (i, ds) in deps.iter().enumerate() {
            let me = order.iter().position(|n| *n == name(i)).unwrap();
            for &d in ds {
                let dep = order.iter().position(|n| *n == name(d)).unwrap();
                prop_assert!(dep < me);
            }
        }
    }

    #[test]
    fn back_edge_yields_genuine_cycle(
        deps in acyclic_deps(12),
        from_pick in any::<usize>(),
        to_pick in any::<usize>(),
    ) {
        let n = deps.len();
        let mut deps = deps;
        // Chain every job to its predecessor so any back edge closes a cycle.
        for (i, ds) in deps.iter_mut().enumerate().skip(1) {
            ds.insert(i - 1);
        }
        let low = to_pick % n;
        let high = low + from_pick % (n - low);
        // low depends on high; high reaches low through the chain.
        deps[low].insert(high);

        let wf = workflow_from(&deps);
        let walk = match wf.validate() {
            Err(ValidationError::Cycle(walk)) => walk,
            other => return Err(TestCaseError::fail(format!("expected cycle, got {other:?}"))),
        };

        prop_assert!(walk.len() >= 2);
        prop_assert_eq!(walk.first(), walk.last());
        for pair in walk.windows(2) {
            let job = wf.job(&pair[0]).unwrap();
            prop_assert!(job.dependencies.contains(&pair[1]));
        }
        let distinct: HashSet<&String> = walk[..walk.len() - 1].iter().collect();
        prop_assert_eq!(distinct.len(), walk.len() - 1);
    }

    #[test]
    fn simulated_run_completes_every_job_once(deps in acyclic_deps(12)) {
        let mut wf = workflow_from(&deps);
        let mut submitted = Vec::new();
        let mut rounds = 0;

        loop {
            let ready = wf.ready_job_names();
            if ready.is_empty() {
                break;
            }
            rounds += 1;
            prop_assert!(rounds <= deps.len());
            for job in ready {
                wf.update_status(&job, JobStatus::Running, None).unwrap();
                wf.update_status(&job, JobStatus::Completed, None).unwrap();
                submitted.push(job);
            }
        }

        prop_assert!(wf.all_completed());
        let unique: HashSet<&String> = submitted.iter().collect();
        prop_assert_eq!(unique.len(), deps.len());
        prop_assert_eq!(submitted.len(), deps.len());
    }
}
