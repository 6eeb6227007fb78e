//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.lighthouse-batch.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".lighthouse-batch.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Audit tool invocation settings.
    #[serde(default)]
    pub audit: AuditConfig,

    /// URLs to audit.
    #[serde(default)]
    pub targets: TargetsConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory under which per-URL output directories are created.
    #[serde(default = "default_output_root")]
    pub output_root: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            verbose: false,
        }
    }
}

fn default_output_root() -> String {
    ".".to_string()
}

/// How the audit tool is launched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Program and leading arguments, e.g. `["npx", "lighthouse"]`.
    #[serde(default = "default_command")]
    pub command: Vec<String>,

    /// Value passed as `--chrome-flags`.
    #[serde(default = "default_chrome_flags")]
    pub chrome_flags: String,

    /// Page load timeout passed as `--max-wait-for-load`.
    #[serde(default = "default_max_wait")]
    pub max_wait_for_load_ms: u64,

    /// Pass `--verbose` so the run log carries the tool's full trace.
    #[serde(default = "default_true")]
    pub verbose: bool,

    /// Emulated device, passed as `--emulated-form-factor`.
    #[serde(default = "default_form_factor")]
    pub form_factor: String,

    /// Simulated throttling parameters.
    #[serde(default)]
    pub throttling: ThrottlingConfig,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            chrome_flags: default_chrome_flags(),
            max_wait_for_load_ms: default_max_wait(),
            verbose: true,
            form_factor: default_form_factor(),
            throttling: ThrottlingConfig::default(),
        }
    }
}

fn default_command() -> Vec<String> {
    vec!["npx".to_string(), "lighthouse".to_string()]
}

fn default_chrome_flags() -> String {
    "--headless --no-sandbox".to_string()
}

fn default_max_wait() -> u64 {
    60_000
}

fn default_true() -> bool {
    true
}

fn default_form_factor() -> String {
    "mobile".to_string()
}

/// Network and CPU throttling for `--throttling-method=simulate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrottlingConfig {
    #[serde(default = "default_cpu_slowdown")]
    pub cpu_slowdown_multiplier: u32,

    #[serde(default = "default_throughput")]
    pub throughput_kbps: u32,

    #[serde(default = "default_upload_throughput")]
    pub upload_throughput_kbps: u32,

    #[serde(default = "default_latency")]
    pub latency_ms: u32,
}

impl Default for ThrottlingConfig {
    fn default() -> Self {
        Self {
            cpu_slowdown_multiplier: default_cpu_slowdown(),
            throughput_kbps: default_throughput(),
            upload_throughput_kbps: default_upload_throughput(),
            latency_ms: default_latency(),
        }
    }
}

fn default_cpu_slowdown() -> u32 {
    2
}

fn default_throughput() -> u32 {
    6000
}

fn default_upload_throughput() -> u32 {
    750
}

fn default_latency() -> u32 {
    100
}

/// URLs audited when none are given on the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetsConfig {
    #[serde(default = "default_urls")]
    pub urls: Vec<String>,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            urls: default_urls(),
        }
    }
}

fn default_urls() -> Vec<String> {
    vec![
        "https://furusato.jreast.co.jp/furusato".to_string(),
        "https://furusato.jreast.co.jp/furusato/ranking".to_string(),
    ]
}

/// Report generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Also write `metrics.json` next to the spreadsheet.
    #[serde(default)]
    pub json_summary: bool,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if !args.urls.is_empty() {
            self.targets.urls = args.urls.clone();
        }

        if let Some(ref root) = args.output_root {
            self.general.output_root = root.display().to_string();
        }

        if let Some(ref command) = args.command {
            let parts: Vec<String> = command.split_whitespace().map(String::from).collect();
            if !parts.is_empty() {
                self.audit.command = parts;
            }
        }

        if args.json_summary {
            self.report.json_summary = true;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level from `[general] verbose`, unless the CLI asks for quiet output.
    pub fn log_level(&self, args: &crate::cli::Args) -> tracing::Level {
        if !args.quiet && self.general.verbose {
            tracing::Level::DEBUG
        } else {
            args.log_level()
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> Result<String> {
        let config = Config::default();
        toml::to_string_pretty(&config).context("Failed to serialize default config")
    }
}
