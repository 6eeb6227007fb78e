//! Metric extraction from Lighthouse JSON reports.
//!
//! Each run's report is read independently. Missing fields become
//! [`MetricValue::NotAvailable`]; a report that cannot be read or has an
//! unexpected shape is skipped without affecting the other runs.

use crate::models::{Metric, MetricRecord, MetricValue, RunId, Target, RUNS_PER_SERIES};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Why a run's report could not be turned into a record.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unexpected report structure: {0}")]
    Structure(String),
}

/// Audit ids read from the `audits` section, by metric.
const AUDIT_IDS: [(Metric, &str); 7] = [
    (Metric::Ttfb, "server-response-time"),
    (Metric::Fcp, "first-contentful-paint"),
    (Metric::Lcp, "largest-contentful-paint"),
    (Metric::SpeedIndex, "speed-index"),
    (Metric::Tbt, "total-blocking-time"),
    (Metric::Tti, "interactive"),
    (Metric::Cls, "cumulative-layout-shift"),
];

/// Extract records for every run of a target whose report exists.
///
/// Records are returned in run order. Absent or unreadable reports are
/// logged and contribute nothing.
pub fn extract_series(target: &Target) -> Vec<MetricRecord> {
    let mut records = Vec::new();

    for run in 1..=RUNS_PER_SERIES {
        let json_path = target.artifact(run).json_path;

        if !json_path.exists() {
            warn!("JSON file {} not found!", json_path.display());
            continue;
        }

        match extract_run(&json_path, run) {
            Ok(record) => {
                debug!("Extracted metrics for run {}", run);
                records.push(record);
            }
            Err(e) => {
                warn!("Error extracting metrics from {}: {}", json_path.display(), e);
            }
        }
    }

    records
}

/// Read one report file and extract its record.
pub fn extract_run(path: &Path, run: u32) -> Result<MetricRecord, ExtractError> {
    let content = std::fs::read_to_string(path).map_err(|source| ExtractError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let document: Value = serde_json::from_str(&content).map_err(|source| ExtractError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    extract_document(&document, RunId::Run(run))
}

/// Extract a record from a parsed Lighthouse report.
pub fn extract_document(document: &Value, run: RunId) -> Result<MetricRecord, ExtractError> {
    let root = document
        .as_object()
        .ok_or_else(|| ExtractError::Structure("report root is not an object".to_string()))?;

    let audits = section(root, "audits")?;
    let categories = section(root, "categories")?;

    let mut record = MetricRecord::empty(run);
    record.performance = performance_score(categories);

    for (metric, id) in AUDIT_IDS {
        let audit = audits.and_then(|a| a.get(id));
        let value = match metric {
            Metric::Tbt | Metric::Tti => numeric_or_error(audit),
            _ => numeric(audit),
        };
        record.set(metric, value);
    }

    Ok(record)
}

/// Look up an optional top-level section, which must be an object when present.
fn section<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ExtractError> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(ExtractError::Structure(format!(
            "'{}' is not an object",
            key
        ))),
    }
}

/// Performance category score scaled to 0-100 and rounded to 2 decimals.
fn performance_score(categories: Option<&Map<String, Value>>) -> MetricValue {
    categories
        .and_then(|c| c.get("performance"))
        .and_then(|p| p.get("score"))
        .and_then(Value::as_f64)
        .map(|score| MetricValue::Number(round2(score * 100.0)))
        .unwrap_or(MetricValue::NotAvailable)
}

fn numeric(audit: Option<&Value>) -> MetricValue {
    audit
        .and_then(|a| a.get("numericValue"))
        .and_then(Value::as_f64)
        .map(MetricValue::Number)
        .unwrap_or(MetricValue::NotAvailable)
}

/// Like [`numeric`], but keeps the audit's `errorMessage` when there is no value.
fn numeric_or_error(audit: Option<&Value>) -> MetricValue {
    match numeric(audit) {
        MetricValue::NotAvailable => audit
            .and_then(|a| a.get("errorMessage"))
            .and_then(Value::as_str)
            .map(|msg| MetricValue::Error(msg.to_string()))
            .unwrap_or(MetricValue::NotAvailable),
        value => value,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
