//! Analysis modules.
//!
//! Extraction of metrics from the audit tool's reports and aggregation of
//! the per-run records into a table.

pub mod aggregator;
pub mod extractor;

pub use aggregator::*;
pub use extractor::extract_series;
