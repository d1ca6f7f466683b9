//! Artifact Guard CLI
//!
//! The `artguard` command protects the structured artifacts of a security
//! workflow.
//!
//! ## Commands
//!
//! - `validate`: Check artifacts and print a report
//! - `repair`: Back up and repair one artifact
//! - `check`: Full pass (validate, repair, degrade, alert) with an exit code
//! - `synthesize`: Write emergency placeholders for the given artifacts

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use artguard_core::{
    build_channels, discover_artifacts, parse_name_list, render_summary_markdown,
    render_summary_text, write_summary_json, ArtifactGuard, ChannelKind, EmergencySynthesizer,
    GuardConfig, Repairer, StructuralValidator,
};

#[derive(Parser)]
#[command(name = "artguard")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Corruption guard for security workflow artifacts", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate artifacts without modifying them
    Validate {
        /// Files to validate
        paths: Vec<PathBuf>,

        /// Artifacts tree to discover files under
        #[arg(long)]
        root: Option<PathBuf>,

        /// Report format: text, markdown or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Also write the summary as JSON to this path
        #[arg(long)]
        summary_json: Option<PathBuf>,
    },

    /// Back up and attempt to repair one artifact
    Repair {
        /// File to repair
        path: PathBuf,

        /// Backup directory (default: .artguard/backups)
        #[arg(long, env = "ARTGUARD_BACKUP_DIR")]
        backup_dir: Option<PathBuf>,
    },

    /// Run a full guard pass and exit with a severity-scaled code
    Check {
        /// Files to check
        paths: Vec<PathBuf>,

        /// Artifacts tree to discover files under
        #[arg(long)]
        root: Option<PathBuf>,

        /// Comma-separated critical file names
        #[arg(long, env = "ARTGUARD_CRITICAL_FILES")]
        critical: Option<String>,

        /// Comma-separated alert channels
        /// (log,console,json-file,annotations,step-summary)
        #[arg(long, default_value = "log,console")]
        channels: String,

        /// Directory for JSON alert files
        #[arg(long, env = "ARTGUARD_ALERTS_DIR")]
        alerts_dir: Option<PathBuf>,

        /// Backup directory
        #[arg(long, env = "ARTGUARD_BACKUP_DIR")]
        backup_dir: Option<PathBuf>,

        /// Invalid fraction at or above which the level is MINIMAL
        #[arg(long, env = "ARTGUARD_MINIMAL_RATIO")]
        minimal_ratio: Option<f64>,

        /// Write the full guard report as JSON to this path
        #[arg(long)]
        report_json: Option<PathBuf>,
    },

    /// Write emergency placeholders for the given artifacts
    Synthesize {
        /// Artifacts to replace
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Directory to write placeholders into
        #[arg(long)]
        output_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    artguard_core::telemetry::init_tracing(cli.json, level);

    let code = match cli.command {
        Commands::Validate {
            paths,
            root,
            format,
            summary_json,
        } => cmd_validate(paths, root.as_deref(), &format, summary_json.as_deref()).await?,
        Commands::Repair { path, backup_dir } => cmd_repair(&path, backup_dir)?,
        Commands::Check {
            paths,
            root,
            critical,
            channels,
            alerts_dir,
            backup_dir,
            minimal_ratio,
            report_json,
        } => {
            let mut config = GuardConfig::from_env();
            if let Some(names) = critical {
                config = config.with_critical_files(parse_name_list(&names));
            }
            if let Some(dir) = alerts_dir {
                config = config.with_alerts_dir(dir);
            }
            if let Some(dir) = backup_dir {
                config = config.with_backup_dir(dir);
            }
            if let Some(ratio) = minimal_ratio {
                if !(0.0..=1.0).contains(&ratio) {
                    bail!("--minimal-ratio must be between 0 and 1, got {ratio}");
                }
                config = config.with_minimal_ratio(ratio);
            }
            cmd_check(paths, root.as_deref(), config, &channels, report_json.as_deref()).await?
        }
        Commands::Synthesize { paths, output_dir } => cmd_synthesize(&paths, &output_dir)?,
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Explicit paths plus everything discovered under `root`; the current
/// directory is searched when neither is given.
fn resolve_paths(mut paths: Vec<PathBuf>, root: Option<&Path>) -> Result<Vec<PathBuf>> {
    let root = match root {
        Some(root) => Some(root),
        None if paths.is_empty() => Some(Path::new(".")),
        None => None,
    };
    if let Some(root) = root {
        let found = discover_artifacts(root)
            .with_context(|| format!("Failed to discover artifacts under {}", root.display()))?;
        for path in found {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    if paths.is_empty() {
        bail!("No artifacts to check");
    }
    Ok(paths)
}

async fn cmd_validate(
    paths: Vec<PathBuf>,
    root: Option<&Path>,
    format: &str,
    summary_json: Option<&Path>,
) -> Result<i32> {
    let paths = resolve_paths(paths, root)?;
    let config = GuardConfig::from_env();
    let summary = StructuralValidator::new()
        .validate_all(&paths, config.max_parallel_validations)
        .await;

    match format {
        "text" => print!("{}", render_summary_text(&summary)),
        "markdown" => print!("{}", render_summary_markdown(&summary)),
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        other => bail!("Unknown format '{other}'. Available: text, markdown, json"),
    }

    if let Some(out) = summary_json {
        write_summary_json(&summary, out)
            .with_context(|| format!("Failed to write summary to {}", out.display()))?;
    }

    Ok(if summary.all_valid() { 0 } else { 1 })
}

fn cmd_repair(path: &Path, backup_dir: Option<PathBuf>) -> Result<i32> {
    let backup_dir = backup_dir.unwrap_or_else(|| GuardConfig::from_env().backup_dir);
    let record = Repairer::new(backup_dir)
        .repair(path)
        .with_context(|| format!("Failed to repair {}", path.display()))?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    if record.succeeded {
        info!(path = %path.display(), repairs = record.repairs_made.len(), "repair succeeded");
        Ok(0)
    } else {
        info!(path = %path.display(), backup = %record.backup_path.display(), "repair exhausted");
        Ok(1)
    }
}

async fn cmd_check(
    paths: Vec<PathBuf>,
    root: Option<&Path>,
    config: GuardConfig,
    channels: &str,
    report_json: Option<&Path>,
) -> Result<i32> {
    let paths = resolve_paths(paths, root)?;
    let kinds = ChannelKind::parse_list(channels).map_err(anyhow::Error::msg)?;
    let channels = build_channels(&kinds, &config);

    let guard = ArtifactGuard::new(config);
    let report = guard
        .run(&paths, &channels)
        .await
        .context("Guard pass failed")?;

    if let Some(out) = report_json {
        let body = serde_json::to_vec_pretty(&report)?;
        artguard_core::atomic::write_atomic(out, &body)
            .with_context(|| format!("Failed to write report to {}", out.display()))?;
    }

    Ok(report.exit_code())
}

fn cmd_synthesize(paths: &[PathBuf], output_dir: &Path) -> Result<i32> {
    let written = EmergencySynthesizer::new()
        .synthesize(paths, output_dir)
        .context("Emergency synthesis failed")?;
    for path in &written {
        println!("{}", path.display());
    }
    Ok(0)
}
