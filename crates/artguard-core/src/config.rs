//! Guard configuration.
//!
//! Defaults come from environment variables so CI jobs can tune a run
//! without flags; the CLI layers its own overrides on top.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::degradation::DegradationPolicy;
use crate::domain::DEFAULT_CRITICAL_FILES;

/// Runtime configuration for a guard pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Directory receiving timestamped pre-repair backups
    pub backup_dir: PathBuf,
    /// Directory receiving JSON alert files
    pub alerts_dir: PathBuf,
    /// File names whose corruption forces emergency mode
    pub critical_files: Vec<String>,
    /// Invalid fraction at or above which the level is MINIMAL
    pub minimal_invalid_ratio: f64,
    /// Upper bound on concurrently validated files
    pub max_parallel_validations: usize,
    /// Deadline for collecting every channel's delivery result
    pub delivery_timeout_ms: u64,
    /// Environment variable naming the CI step-summary file
    pub step_summary_env: String,
    /// Emit one CI annotation per corrupted file in addition to the summary line
    pub annotate_files: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        GuardConfig {
            backup_dir: std::env::var("ARTGUARD_BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".artguard/backups")),
            alerts_dir: std::env::var("ARTGUARD_ALERTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".artguard/alerts")),
            critical_files: std::env::var("ARTGUARD_CRITICAL_FILES")
                .map(|v| parse_name_list(&v))
                .unwrap_or_else(|_| default_critical_files()),
            minimal_invalid_ratio: env_or("ARTGUARD_MINIMAL_RATIO", 0.5),
            max_parallel_validations: env_or("ARTGUARD_MAX_PARALLEL", 8usize).max(1),
            delivery_timeout_ms: env_or("ARTGUARD_DELIVERY_TIMEOUT_MS", 10_000u64),
            step_summary_env: "GITHUB_STEP_SUMMARY".to_string(),
            annotate_files: true,
        }
    }
}

impl GuardConfig {
    /// Create a config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Set the backup directory.
    pub fn with_backup_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.backup_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the directory for JSON alert files.
    pub fn with_alerts_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.alerts_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Replace the critical file names.
    pub fn with_critical_files<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.critical_files = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the invalid fraction at or above which the level is MINIMAL.
    pub fn with_minimal_ratio(mut self, ratio: f64) -> Self {
        self.minimal_invalid_ratio = ratio;
        self
    }

    /// Name the environment variable holding the step-summary path.
    pub fn with_step_summary_env(mut self, var: &str) -> Self {
        self.step_summary_env = var.to_string();
        self
    }

    /// Degradation policy derived from the critical list and threshold.
    pub fn degradation_policy(&self) -> DegradationPolicy {
        DegradationPolicy::new(self.critical_files.iter().cloned(), self.minimal_invalid_ratio)
    }
}

fn default_critical_files() -> Vec<String> {
    DEFAULT_CRITICAL_FILES.iter().map(|s| s.to_string()).collect()
}

/// Split a comma-separated list, dropping blanks.
pub fn parse_name_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = key, value = %raw, "ignoring unparsable config value");
            default
        }),
        Err(_) => default,
    }
}
