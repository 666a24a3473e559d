//! Reconciliation driver
//!
//! Runs one refresh cycle and aggregates per-target results.

mod report;
mod run;

pub use report::{Failed, RunReport, Succeeded, EXIT_FATAL, EXIT_PARTIAL};
pub use run::{run, RunRequest};
