//! Per-target orchestration.
//!
//! Targets are processed one at a time: run series, extraction,
//! aggregation, report. A failure in one target never stops the next.

use crate::analysis::{build_table, extract_series, numeric_counts};
use crate::audit::{run_series, AuditRunner};
use crate::models::{Target, TargetOutcome};
use crate::report::{generator::TIMESTAMP_FORMAT, write_json_summary, write_spreadsheet};
use anyhow::{Context, Result};
use chrono::Local;
use tracing::{debug, error, info, warn};

/// Switches that change what the pipeline does per target.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Extract from existing reports instead of launching the audit tool.
    pub reuse_artifacts: bool,
    /// Also write `metrics.json` beside the spreadsheet.
    pub json_summary: bool,
    /// Show a spinner while each run is in progress.
    pub show_progress: bool,
}

pub struct Pipeline<R: AuditRunner> {
    runner: R,
    options: PipelineOptions,
}

impl<R: AuditRunner> Pipeline<R> {
    pub fn new(runner: R, options: PipelineOptions) -> Self {
        Self { runner, options }
    }

    /// Process all targets in order.
    pub async fn run_all(&self, targets: &[Target]) -> Vec<TargetOutcome> {
        let mut outcomes = Vec::with_capacity(targets.len());

        for target in targets {
            info!("Auditing {}", target.url);
            let outcome = match self.process_target(target).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Processing {} failed: {:#}", target.url, e);
                    TargetOutcome {
                        url: target.url.clone(),
                        output_dir: target.output_dir.clone(),
                        runs_attempted: 0,
                        records: 0,
                        report_path: None,
                        error: Some(format!("{:#}", e)),
                    }
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }

    /// Run the series for one target and write its report.
    pub async fn process_target(&self, target: &Target) -> Result<TargetOutcome> {
        std::fs::create_dir_all(&target.output_dir).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                target.output_dir.display()
            )
        })?;

        let runs_attempted = if self.options.reuse_artifacts {
            info!("Reusing existing reports in {}", target.output_dir.display());
            0
        } else {
            let series = run_series(&self.runner, target, self.options.show_progress).await;
            if !series.is_complete() {
                warn!(
                    "Series for {} stopped early; extracting from {} successful run(s)",
                    target.url, series.succeeded
                );
            }
            series.attempted
        };

        let records = extract_series(target);
        let record_count = records.len();
        for (metric, count) in numeric_counts(&records) {
            debug!("{}: {}/{} numeric values", metric.label(), count, record_count);
        }

        let mut outcome = TargetOutcome {
            url: target.url.clone(),
            output_dir: target.output_dir.clone(),
            runs_attempted,
            records: record_count,
            report_path: None,
            error: None,
        };

        let Some(table) = build_table(records) else {
            warn!("No metrics data found for {}", target.url);
            println!("No metrics data found. Excel file not created.");
            return Ok(outcome);
        };

        debug!("Metrics table for {} has {} rows", target.url, table.len());

        let completed_at = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let report_path = target.report_path();
        write_spreadsheet(&table, &target.url, &completed_at, &report_path)?;
        println!("Excel report saved at {}", report_path.display());

        if self.options.json_summary {
            let summary_path = target.summary_path();
            write_json_summary(&table, &target.url, &completed_at, &summary_path)?;
            info!("JSON summary saved at {}", summary_path.display());
        }

        outcome.report_path = Some(report_path);
        Ok(outcome)
    }
}
