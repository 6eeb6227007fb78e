//! Data models for the audit pipeline.
//!
//! This module contains the core data structures shared by the runner,
//! the extractor, the aggregator and the report writer.

use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// Number of audit runs performed per target.
pub const RUNS_PER_SERIES: u32 = 5;

/// Text written wherever a metric could not be read.
pub const NOT_AVAILABLE: &str = "N/A";

/// Characters replaced with `_` when deriving a directory name from a URL.
const UNSAFE_PATH_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// A URL to audit together with the directory its artifacts land in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// The audited URL.
    pub url: String,
    /// Directory name, also used as the spreadsheet file stem.
    pub name: String,
    /// Directory holding the JSON reports, logs and the spreadsheet.
    pub output_dir: PathBuf,
}

impl Target {
    /// Creates a target whose directory is derived from the URL under `output_root`.
    pub fn new(url: impl Into<String>, output_root: &Path) -> Self {
        let url = url.into();
        let name = output_dir_name(&url);
        let output_dir = output_root.join(&name);
        Self {
            url,
            name,
            output_dir,
        }
    }

    /// Creates a target with an explicit output directory.
    pub fn with_output_dir(url: impl Into<String>, output_dir: PathBuf) -> Self {
        let name = output_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "lighthouse_results".to_string());
        Self {
            url: url.into(),
            name,
            output_dir,
        }
    }

    /// Artifact paths for the given run number.
    pub fn artifact(&self, run: u32) -> RunArtifact {
        RunArtifact {
            run,
            json_path: self.output_dir.join(format!("report_{}.json", run)),
            log_path: self
                .output_dir
                .join(format!("lighthouse_verbose_run_{}.log", run)),
        }
    }

    /// Path of the spreadsheet report.
    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.xlsx", self.name))
    }

    /// Path of the optional JSON summary.
    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join("metrics.json")
    }
}

/// Derive a filesystem-safe directory name from a URL.
///
/// The scheme and `//` are dropped; path separators and other characters
/// that are invalid in file names become `_`.
pub fn output_dir_name(url: &str) -> String {
    let rest = match url.split_once("//") {
        Some((_, rest)) => rest,
        None => url,
    };
    rest.replace(UNSAFE_PATH_CHARS, "_")
}

/// Paths owned by a single audit run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArtifact {
    /// Run number, 1-indexed.
    pub run: u32,
    /// Where the audit tool writes its JSON report.
    pub json_path: PathBuf,
    /// Where the tool's combined output is captured.
    pub log_path: PathBuf,
}

/// A single metric cell.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// A measured value.
    Number(f64),
    /// The audit reported an error instead of a measurement.
    Error(String),
    /// The value is missing from the report.
    NotAvailable,
}

impl MetricValue {
    /// Returns the numeric value, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(n) => write!(f, "{}", n),
            MetricValue::Error(msg) => write!(f, "{}", msg),
            MetricValue::NotAvailable => write!(f, "{}", NOT_AVAILABLE),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Number(n) => serializer.serialize_f64(*n),
            MetricValue::Error(msg) => serializer.serialize_str(msg),
            MetricValue::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

/// Identifies a table row: a run number or the synthetic average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunId {
    Run(u32),
    Average,
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunId::Run(n) => write!(f, "{}", n),
            RunId::Average => write!(f, "average"),
        }
    }
}

impl Serialize for RunId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RunId::Run(n) => serializer.serialize_u32(*n),
            RunId::Average => serializer.serialize_str("average"),
        }
    }
}

/// The metric columns of the report, in column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Performance,
    Ttfb,
    Fcp,
    Lcp,
    SpeedIndex,
    Tbt,
    Tti,
    Cls,
}

impl Metric {
    /// All metrics in report column order.
    pub const ALL: [Metric; 8] = [
        Metric::Performance,
        Metric::Ttfb,
        Metric::Fcp,
        Metric::Lcp,
        Metric::SpeedIndex,
        Metric::Tbt,
        Metric::Tti,
        Metric::Cls,
    ];

    /// Column header used in the spreadsheet.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Performance => "Performance",
            Metric::Ttfb => "TTFB(ms)",
            Metric::Fcp => "FCP(ms)",
            Metric::Lcp => "LCP(ms)",
            Metric::SpeedIndex => "Speed Index(ms)",
            Metric::Tbt => "TBT(ms)",
            Metric::Tti => "TTI(ms)",
            Metric::Cls => "CLS",
        }
    }
}

/// One row of the metrics table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    pub run: RunId,
    #[serde(rename = "Performance")]
    pub performance: MetricValue,
    #[serde(rename = "TTFB(ms)")]
    pub ttfb: MetricValue,
    #[serde(rename = "FCP(ms)")]
    pub fcp: MetricValue,
    #[serde(rename = "LCP(ms)")]
    pub lcp: MetricValue,
    #[serde(rename = "Speed Index(ms)")]
    pub speed_index: MetricValue,
    #[serde(rename = "TBT(ms)")]
    pub tbt: MetricValue,
    #[serde(rename = "TTI(ms)")]
    pub tti: MetricValue,
    #[serde(rename = "CLS")]
    pub cls: MetricValue,
}

impl MetricRecord {
    /// Creates a record with every metric unavailable.
    pub fn empty(run: RunId) -> Self {
        Self {
            run,
            performance: MetricValue::NotAvailable,
            ttfb: MetricValue::NotAvailable,
            fcp: MetricValue::NotAvailable,
            lcp: MetricValue::NotAvailable,
            speed_index: MetricValue::NotAvailable,
            tbt: MetricValue::NotAvailable,
            tti: MetricValue::NotAvailable,
            cls: MetricValue::NotAvailable,
        }
    }

    /// Returns the value of a metric column.
    pub fn get(&self, metric: Metric) -> &MetricValue {
        match metric {
            Metric::Performance => &self.performance,
            Metric::Ttfb => &self.ttfb,
            Metric::Fcp => &self.fcp,
            Metric::Lcp => &self.lcp,
            Metric::SpeedIndex => &self.speed_index,
            Metric::Tbt => &self.tbt,
            Metric::Tti => &self.tti,
            Metric::Cls => &self.cls,
        }
    }

    /// Sets the value of a metric column.
    pub fn set(&mut self, metric: Metric, value: MetricValue) {
        let slot = match metric {
            Metric::Performance => &mut self.performance,
            Metric::Ttfb => &mut self.ttfb,
            Metric::Fcp => &mut self.fcp,
            Metric::Lcp => &mut self.lcp,
            Metric::SpeedIndex => &mut self.speed_index,
            Metric::Tbt => &mut self.tbt,
            Metric::Tti => &mut self.tti,
            Metric::Cls => &mut self.cls,
        };
        *slot = value;
    }
}

/// Per-run records followed by exactly one average record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricTable {
    pub runs: Vec<MetricRecord>,
    pub average: MetricRecord,
}

impl MetricTable {
    /// Iterates over all rows, average last.
    pub fn rows(&self) -> impl Iterator<Item = &MetricRecord> {
        self.runs.iter().chain(std::iter::once(&self.average))
    }

    /// Number of rows including the average.
    pub fn len(&self) -> usize {
        self.runs.len() + 1
    }
}

/// What happened to a single target.
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    /// The audited URL.
    pub url: String,
    /// Directory holding the target's artifacts.
    pub output_dir: PathBuf,
    /// Number of audit runs launched.
    pub runs_attempted: u32,
    /// Number of records extracted.
    pub records: usize,
    /// Path of the written spreadsheet, if any.
    pub report_path: Option<PathBuf>,
    /// Error that stopped processing of this target.
    pub error: Option<String>,
}
