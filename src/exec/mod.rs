// src/exec/mod.rs

//! Execution layer.
//!
//! - [`backend`] defines the [`Executor`] trait the driver talks to.
//! - [`process`] wraps `tokio::process` behind [`CommandRunner`] so both
//!   executors can be exercised without real processes.
//! - [`local`] runs jobs synchronously on this machine.
//! - [`dialect`] spells submit/status/kill commands for one batch CLI (LSF).
//! - [`remote`] tracks remote ids and polls the cluster for completion.

pub mod backend;
pub mod dialect;
pub mod local;
pub mod process;
pub mod remote;

pub use backend::{ExecFuture, Executor, StatusUpdate, Submission};
pub use dialect::{BatchCommand, BatchDialect, LsfDialect, RemoteState, SubmitRequest};
pub use local::LocalExecutor;
pub use process::{CommandOutput, CommandRunner, ProcessRunner};
pub use remote::{RemoteExecutor, RemoteSettings};
