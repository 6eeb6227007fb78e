//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// lighthouse-batch - repeated Lighthouse audits with averaged metrics
///
/// Runs Lighthouse five times per URL with fixed mobile throttling, extracts
/// the key performance metrics from each JSON report and writes them, with
/// an average row, to an xlsx spreadsheet per URL.
///
/// Examples:
///   lighthouse-batch
///   lighthouse-batch --url https://example.com/
///   URL=https://example.com/ OUTPUT_DIR=lighthouse_results lighthouse-batch
///   lighthouse-batch --url https://example.com/ --reuse-artifacts
///   lighthouse-batch --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// URL to audit (repeatable or comma-separated)
    ///
    /// When omitted, the URLs from the config file are used.
    #[arg(short, long = "url", value_name = "URL", env = "URL", value_delimiter = ',')]
    pub urls: Vec<String>,

    /// Output directory for a single URL
    ///
    /// Overrides the directory name derived from the URL. Only valid when
    /// exactly one URL is audited.
    #[arg(long, value_name = "DIR", env = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Parent directory for the per-URL output directories
    #[arg(long, value_name = "DIR")]
    pub output_root: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .lighthouse-batch.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Audit command to launch (whitespace-separated), e.g. "lighthouse"
    #[arg(long, value_name = "CMD")]
    pub command: Option<String>,

    /// Skip launching the audit tool and extract from existing reports
    #[arg(long)]
    pub reuse_artifacts: bool,

    /// Also write metrics.json next to each spreadsheet
    #[arg(long)]
    pub json_summary: bool,

    /// Print the audit commands without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with code 2 if any URL produced no report
    #[arg(long)]
    pub fail_on_empty: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .lighthouse-batch.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        for url in &self.urls {
            validate_url(url)?;
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.output_dir.is_some() && self.urls.len() > 1 {
            return Err("--output-dir can only be used with a single URL".to_string());
        }

        if let Some(ref command) = self.command {
            if command.trim().is_empty() {
                return Err("Audit command must not be empty".to_string());
            }
        }

        if self.reuse_artifacts && self.dry_run {
            return Err("Cannot use both --reuse-artifacts and --dry-run".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

/// Check that a target URL is an http(s) URL.
pub fn validate_url(url: &str) -> Result<(), String> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(format!("URL must start with 'http://' or 'https://': {}", url))
    }
}
