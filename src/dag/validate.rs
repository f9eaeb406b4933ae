// src/dag/validate.rs

//! Structural checks on a job graph.
//!
//! Run in this order so the cheapest, most specific error wins:
//! 1. every job has a command
//! 2. every dependency names a job in the graph
//! 3. the dependency relation is acyclic

use std::collections::HashMap;

use crate::dag::job::{Job, JobName};
use crate::errors::ValidationError;

pub(crate) fn validate_jobs(
    jobs: &[Job],
    index: &HashMap<JobName, usize>,
) -> Result<(), ValidationError> {
    for job in jobs {
        if !job.has_command() {
            return Err(ValidationError::MissingCommand(job.name.clone()));
        }
    }

    for job in jobs {
        for dep in &job.dependencies {
            if !index.contains_key(dep) {
                return Err(ValidationError::UnknownDependency {
                    job: job.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    if let Some(walk) = find_cycle(jobs, index) {
        return Err(ValidationError::Cycle(walk));
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Depth-first search over `job -> dependency` edges, tracking the active
/// path. Returns the closed walk `[n, .., n]` the first time a node is seen
/// again on its own path.
///
/// Roots are visited in slice order and dependencies in declaration order,
/// so the reported walk is deterministic. The traversal keeps its own stack
/// of `(node, next dependency index)` frames, so chain depth is bounded by
/// heap, not by the thread stack.
fn find_cycle(jobs: &[Job], index: &HashMap<JobName, usize>) -> Option<Vec<JobName>> {
    let mut marks = vec![Mark::Unvisited; jobs.len()];
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..jobs.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::OnPath;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let (node, cursor) = *frame;
            let Some(dep) = jobs[node].dependencies.get(cursor) else {
                marks[node] = Mark::Done;
                stack.pop();
                continue;
            };
            frame.1 += 1;

            // Unknown names were rejected before we got here.
            let Some(&next) = index.get(dep) else {
                continue;
            };

            match marks[next] {
                Mark::OnPath => {
                    let start = stack.iter().position(|&(n, _)| n == next).unwrap_or(0);
                    let mut walk: Vec<JobName> = stack[start..]
                        .iter()
                        .map(|&(n, _)| jobs[n].name.clone())
                        .collect();
                    walk.push(jobs[next].name.clone());
                    return Some(walk);
                }
                Mark::Unvisited => {
                    marks[next] = Mark::OnPath;
                    stack.push((next, 0));
                }
                Mark::Done => {}
            }
        }
    }

    None
}
