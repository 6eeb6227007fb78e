//! Launching the Lighthouse process.
//!
//! This module builds the fixed Lighthouse command line and runs it as a
//! child process whose combined output is captured in a per-run log file.

use crate::config::AuditConfig;
use crate::models::RunArtifact;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs::File;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Exit code reported when the child was terminated by a signal.
pub const SIGNALLED_EXIT_CODE: i32 = -1;

/// Something that can perform a single audit run.
///
/// Returns the exit code of the run; an `Err` means the run could not be
/// launched at all.
#[async_trait]
pub trait AuditRunner: Send + Sync {
    async fn run(&self, url: &str, artifact: &RunArtifact) -> Result<i32>;
}

/// The fixed Lighthouse invocation.
#[derive(Debug, Clone)]
pub struct AuditCommand {
    config: AuditConfig,
}

impl AuditCommand {
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    /// The program to execute.
    pub fn program(&self) -> &str {
        self.config
            .command
            .first()
            .map(String::as_str)
            .unwrap_or("lighthouse")
    }

    /// Full argument list for one run, excluding the program itself.
    pub fn args(&self, url: &str, artifact: &RunArtifact) -> Vec<String> {
        let throttling = &self.config.throttling;
        let mut args: Vec<String> = self.config.command.iter().skip(1).cloned().collect();

        args.push(url.to_string());
        args.push("--preset=perf".to_string());
        args.push("--output".to_string());
        args.push("json".to_string());
        args.push("--output-path".to_string());
        args.push(artifact.json_path.display().to_string());
        args.push(format!("--chrome-flags={}", self.config.chrome_flags));
        args.push(format!(
            "--max-wait-for-load={}",
            self.config.max_wait_for_load_ms
        ));
        if self.config.verbose {
            args.push("--verbose".to_string());
        }
        args.push(format!("--emulated-form-factor={}", self.config.form_factor));
        args.push("--throttling-method=simulate".to_string());
        args.push(format!(
            "--throttling.cpuSlowdownMultiplier={}",
            throttling.cpu_slowdown_multiplier
        ));
        args.push(format!(
            "--throttling.throughputKbps={}",
            throttling.throughput_kbps
        ));
        args.push(format!(
            "--throttling.uploadThroughputKbps={}",
            throttling.upload_throughput_kbps
        ));
        args.push(format!("--throttling.latency={}", throttling.latency_ms));

        args
    }

    /// Human-readable command line, used for dry runs and debug logs.
    pub fn display(&self, url: &str, artifact: &RunArtifact) -> String {
        let mut parts = vec![self.program().to_string()];
        parts.extend(self.args(url, artifact).into_iter().map(|arg| {
            if arg.contains(' ') {
                format!("\"{}\"", arg)
            } else {
                arg
            }
        }));
        parts.join(" ")
    }
}

/// Runs the audit tool as a child process.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    command: AuditCommand,
}

impl ProcessRunner {
    pub fn new(command: AuditCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl AuditRunner for ProcessRunner {
    async fn run(&self, url: &str, artifact: &RunArtifact) -> Result<i32> {
        let log = File::create(&artifact.log_path).with_context(|| {
            format!("Failed to create log file: {}", artifact.log_path.display())
        })?;
        let log_err = log
            .try_clone()
            .context("Failed to share log file between stdout and stderr")?;

        debug!("Launching: {}", self.command.display(url, artifact));

        let status = match Command::new(self.command.program())
            .args(self.command.args(url, artifact))
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .status()
            .await
        {
            Ok(status) => status,
            Err(e) => {
                let message = format!("Failed to launch audit tool: {}", self.command.program());
                if let Err(write_err) =
                    std::fs::write(&artifact.log_path, format!("{}: {}\n", message, e))
                {
                    debug!("Could not record launch failure in log: {}", write_err);
                }
                return Err(e).context(message);
            }
        };

        debug!("Run {} exited with {}", artifact.run, status);

        Ok(status.code().unwrap_or(SIGNALLED_EXIT_CODE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn artifact(dir: &std::path::Path) -> RunArtifact {
        RunArtifact {
            run: 1,
            json_path: dir.join("report_1.json"),
            log_path: dir.join("lighthouse_verbose_run_1.log"),
        }
    }

    #[test]
    fn test_default_args() {
        let command = AuditCommand::new(AuditConfig::default());
        let artifact = RunArtifact {
            run: 2,
            json_path: PathBuf::from("out/report_2.json"),
            log_path: PathBuf::from("out/lighthouse_verbose_run_2.log"),
        };

        assert_eq!(command.program(), "npx");
        let args = command.args("https://example.com/", &artifact);
        assert_eq!(
            args,
            vec![
                "lighthouse",
                "https://example.com/",
                "--preset=perf",
                "--output",
                "json",
                "--output-path",
                "out/report_2.json",
                "--chrome-flags=--headless --no-sandbox",
                "--max-wait-for-load=60000",
                "--verbose",
                "--emulated-form-factor=mobile",
                "--throttling-method=simulate",
                "--throttling.cpuSlowdownMultiplier=2",
                "--throttling.throughputKbps=6000",
                "--throttling.uploadThroughputKbps=750",
                "--throttling.latency=100",
            ]
        );
    }

    #[test]
    fn test_args_without_verbose() {
        let config = AuditConfig {
            command: vec!["lighthouse".to_string()],
            verbose: false,
            ..AuditConfig::default()
        };
        let command = AuditCommand::new(config);
        let args = command.args("https://example.com/", &artifact(&PathBuf::from("x")));

        assert_eq!(command.program(), "lighthouse");
        assert_eq!(args[0], "https://example.com/");
        assert!(!args.contains(&"--verbose".to_string()));
    }

    #[test]
    fn test_display_quotes_spaced_args() {
        let command = AuditCommand::new(AuditConfig::default());
        let line = command.display("https://example.com/", &artifact(&PathBuf::from("out")));
        assert!(line.starts_with("npx lighthouse https://example.com/"));
        assert!(line.contains("\"--chrome-flags=--headless --no-sandbox\""));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_combined_output_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let config = AuditConfig {
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo to-stdout; echo to-stderr >&2; exit 3".to_string(),
            ],
            ..AuditConfig::default()
        };
        let runner = ProcessRunner::new(AuditCommand::new(config));
        let artifact = artifact(dir.path());

        let code = runner.run("https://example.com/", &artifact).await.unwrap();
        assert_eq!(code, 3);

        let log = std::fs::read_to_string(&artifact.log_path).unwrap();
        assert!(log.contains("to-stdout"));
        assert!(log.contains("to-stderr"));
    }

    #[tokio::test]
    async fn test_run_reports_launch_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = AuditConfig {
            command: vec!["definitely-not-a-real-audit-tool-binary".to_string()],
            ..AuditConfig::default()
        };
        let runner = ProcessRunner::new(AuditCommand::new(config));

        let artifact = artifact(dir.path());

        let result = runner.run("https://example.com/", &artifact).await;
        assert!(result.is_err());

        let log = std::fs::read_to_string(&artifact.log_path).unwrap();
        assert!(log.contains("Failed to launch audit tool"));
        assert!(log.contains("definitely-not-a-real-audit-tool-binary"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_killed_by_signal_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = AuditConfig {
            command: vec!["sh".to_string(), "-c".to_string(), "kill -9 $$".to_string()],
            ..AuditConfig::default()
        };
        let runner = ProcessRunner::new(AuditCommand::new(config));

        let code = runner
            .run("https://example.com/", &artifact(dir.path()))
            .await
            .unwrap();
        assert_eq!(code, SIGNALLED_EXIT_CODE);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_truncates_previous_log() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = artifact(dir.path());
        std::fs::write(&artifact.log_path, "left over from an earlier run\n").unwrap();

        let config = AuditConfig {
            command: vec!["sh".to_string(), "-c".to_string(), "echo fresh".to_string()],
            ..AuditConfig::default()
        };
        let runner = ProcessRunner::new(AuditCommand::new(config));

        let code = runner.run("https://example.com/", &artifact).await.unwrap();
        assert_eq!(code, 0);

        let log = std::fs::read_to_string(&artifact.log_path).unwrap();
        assert!(log.contains("fresh"));
        assert!(!log.contains("left over"));
    }
}
