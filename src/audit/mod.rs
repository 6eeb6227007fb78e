//! Running the audit tool.
//!
//! `runner` launches a single Lighthouse process; `series` drives the
//! fixed number of runs per target.

pub mod runner;
pub mod series;

pub use runner::{AuditCommand, AuditRunner, ProcessRunner};
pub use series::{run_series, SeriesOutcome};
