// src/engine/mod.rs

//! Orchestration engine.
//!
//! [`driver`] owns the run loop and its state machine; [`observer`] is the
//! seam through which the caller hears about the outcome.

pub mod driver;
pub mod observer;

pub use driver::{BlockedJob, Driver, DriverOptions, DriverState, RunOutcome, RunReport};
pub use observer::{ErrorMarkerObserver, LoggingObserver, RunObserver};
