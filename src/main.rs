//! lighthouse-batch - repeated Lighthouse audits with averaged metrics
//!
//! A CLI tool that runs Lighthouse five times per URL, extracts the key
//! performance metrics from each JSON report and writes them, with an
//! average row, to one xlsx spreadsheet per URL.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Configuration or argument error
//!   2 - Some URL produced no report and --fail-on-empty was set

mod analysis;
mod audit;
mod cli;
mod config;
mod models;
mod pipeline;
mod report;

use anyhow::{Context, Result};
use audit::{AuditCommand, ProcessRunner};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use models::{Target, TargetOutcome, RUNS_PER_SERIES};
use pipeline::{Pipeline, PipelineOptions};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is read before logging starts so `[general] verbose` can set the level.
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(config.log_level(&args));

    info!("lighthouse-batch v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .lighthouse-batch.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml()?;
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize URLs, the audit command and throttling.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run every target. Returns the process exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    let targets = build_targets(&config, args.output_dir.as_deref())?;
    if targets.is_empty() {
        anyhow::bail!("No URLs to audit");
    }

    let command = AuditCommand::new(config.audit.clone());

    if args.dry_run {
        return handle_dry_run(&command, &targets);
    }

    println!("🔦 Auditing {} URL(s), {} runs each", targets.len(), RUNS_PER_SERIES);
    for target in &targets {
        println!("   {} -> {}", target.url, target.output_dir.display());
    }

    let options = PipelineOptions {
        reuse_artifacts: args.reuse_artifacts,
        json_summary: config.report.json_summary,
        show_progress: !args.quiet,
    };
    let pipeline = Pipeline::new(ProcessRunner::new(command), options);
    let outcomes = pipeline.run_all(&targets).await;

    print_summary(&outcomes, start_time.elapsed().as_secs_f64());

    let empty = outcomes.iter().filter(|o| o.report_path.is_none()).count();
    if args.fail_on_empty && empty > 0 {
        eprintln!(
            "\n⛔ {} URL(s) produced no report. Failing (exit code 2).",
            empty
        );
        return Ok(2);
    }

    Ok(0)
}

/// Build the target list from the merged configuration.
///
/// Fails when two URLs map to the same output directory.
fn build_targets(config: &Config, output_dir: Option<&Path>) -> Result<Vec<Target>> {
    for url in &config.targets.urls {
        cli::validate_url(url).map_err(anyhow::Error::msg)?;
    }

    if let Some(dir) = output_dir {
        match config.targets.urls.as_slice() {
            [url] => return Ok(vec![Target::with_output_dir(url, dir.to_path_buf())]),
            _ => anyhow::bail!("--output-dir can only be used with a single URL"),
        }
    }

    let root = PathBuf::from(&config.general.output_root);
    let mut claimed: HashMap<PathBuf, &str> = HashMap::new();
    let mut targets = Vec::with_capacity(config.targets.urls.len());

    for url in &config.targets.urls {
        let target = Target::new(url, &root);
        if let Some(previous) = claimed.insert(target.output_dir.clone(), url) {
            anyhow::bail!(
                "{} and {} would both write to {}",
                previous,
                url,
                target.output_dir.display()
            );
        }
        targets.push(target);
    }

    Ok(targets)
}

/// Handle --dry-run: print the commands each series would launch.
fn handle_dry_run(command: &AuditCommand, targets: &[Target]) -> Result<i32> {
    println!("\n🔍 Dry run: no audits will be launched.\n");

    for target in targets {
        println!("   {} -> {}", target.url, target.report_path().display());
        for run in 1..=RUNS_PER_SERIES {
            println!("     {}", command.display(&target.url, &target.artifact(run)));
        }
        println!();
    }

    println!("✅ Dry run complete.");
    Ok(0)
}

fn print_summary(outcomes: &[TargetOutcome], duration: f64) {
    println!("\n📊 Summary:");
    for outcome in outcomes {
        match (&outcome.report_path, &outcome.error) {
            (Some(path), _) => println!(
                "   ✅ {} ({} runs, {} records) -> {}",
                outcome.url,
                outcome.runs_attempted,
                outcome.records,
                path.display()
            ),
            (None, Some(err)) => println!("   ❌ {}: {}", outcome.url, err),
            (None, None) => println!(
                "   ⚠️  {}: no metrics data in {} ({} runs attempted)",
                outcome.url,
                outcome.output_dir.display(),
                outcome.runs_attempted
            ),
        }
    }
    println!("   Duration: {:.1}s", duration);
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is initialized, so problems go to stderr.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load config, using defaults: {:#}", e);
            Ok(Config::default())
        }
    }
}
