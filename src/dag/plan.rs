// src/dag/plan.rs

//! Static execution plan for dry-run output.

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::job::JobName;
use crate::dag::workflow::Workflow;
use crate::errors::ValidationError;

/// Job names in an order where every job appears after all of its
/// dependencies.
///
/// Edge direction: dependency -> job. For `B` declared with `.after("A")` we
/// add edge `A -> B`. Unknown dependencies are skipped; call
/// [`Workflow::validate`] first if they matter.
pub fn execution_order(workflow: &Workflow) -> Result<Vec<JobName>, ValidationError> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for job in workflow.jobs() {
        graph.add_node(job.name.as_str());
    }

    for job in workflow.jobs() {
        for dep in &job.dependencies {
            if workflow.job(dep).is_some() {
                graph.add_edge(dep.as_str(), job.name.as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => {
            // toposort only names one node on the cycle; the DFS in
            // `validate` recovers the full walk.
            match workflow.validate() {
                Err(err @ ValidationError::Cycle(_)) => Err(err),
                _ => {
                    let node = cycle.node_id().to_string();
                    Err(ValidationError::Cycle(vec![node.clone(), node]))
                }
            }
        }
    }
}
