//! Repeated audit runs for one target.
//!
//! A series launches up to [`RUNS_PER_SERIES`] runs in order and stops at
//! the first run that fails. Remaining runs are never launched; whatever
//! reports this series produced are left for extraction. Reports from an
//! earlier invocation are removed before the first run.

use super::runner::AuditRunner;
use crate::models::{Target, RUNS_PER_SERIES};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::ErrorKind;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Result of driving one series.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesOutcome {
    /// Runs that were launched (or attempted to launch).
    pub attempted: u32,
    /// Runs that exited with code 0.
    pub succeeded: u32,
    /// The run that stopped the series, if any.
    pub failed_run: Option<u32>,
}

impl SeriesOutcome {
    /// Whether every run in the series succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed_run.is_none() && self.succeeded == RUNS_PER_SERIES
    }
}

/// Drive the audit runner for runs 1 through 5 against a target.
pub async fn run_series<R: AuditRunner + ?Sized>(
    runner: &R,
    target: &Target,
    show_progress: bool,
) -> SeriesOutcome {
    let mut outcome = SeriesOutcome::default();
    clear_stale_reports(target);

    for run in 1..=RUNS_PER_SERIES {
        let artifact = target.artifact(run);

        println!("Running Lighthouse for run {} on URL: {}", run, target.url);
        println!("Output JSON path: {}", artifact.json_path.display());
        println!("Log path: {}", artifact.log_path.display());

        let spinner = if show_progress {
            Some(run_spinner(run))
        } else {
            None
        };

        outcome.attempted += 1;
        let result = runner.run(&target.url, &artifact).await;

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        match result {
            Ok(0) => {
                outcome.succeeded += 1;
                println!("Lighthouse JSON run {} completed successfully.", run);
            }
            Ok(code) => {
                error!("Run {} for {} exited with code {}", run, target.url, code);
                println!(
                    "Error in Lighthouse JSON run {}. Check {} for details.",
                    run,
                    artifact.log_path.display()
                );
                outcome.failed_run = Some(run);
                break;
            }
            Err(e) => {
                error!("Run {} for {} could not be launched: {:#}", run, target.url, e);
                println!("Error in Lighthouse JSON run {}: {:#}", run, e);
                outcome.failed_run = Some(run);
                break;
            }
        }
    }

    info!(
        "Series for {} finished: {}/{} runs succeeded",
        target.url, outcome.succeeded, RUNS_PER_SERIES
    );

    outcome
}

/// Remove `report_<i>.json` files so a report only ever holds this series' runs.
fn clear_stale_reports(target: &Target) {
    for run in 1..=RUNS_PER_SERIES {
        let path = target.artifact(run).json_path;
        match std::fs::remove_file(&path) {
            Ok(()) => debug!("Removed stale report {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove stale report {}: {}", path.display(), e),
        }
    }
}

fn run_spinner(run: u32) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(format!("Lighthouse run {}/{}", run, RUNS_PER_SERIES));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
