// src/dag/mod.rs

//! Job graph representation and readiness.
//!
//! - [`job`] defines a single unit of work and its status.
//! - [`workflow`] owns the jobs of one run and answers "what can run now?".
//! - [`validate`] holds the structural checks, including cycle detection.
//! - [`plan`] produces a topological order for dry-run output.

pub mod job;
pub mod plan;
mod validate;
pub mod workflow;

pub use job::{Job, JobCommand, JobName, JobStatus, Resources};
pub use plan::execution_order;
pub use workflow::{JobFailure, Workflow};
