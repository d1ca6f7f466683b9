//! Corruption alerts.
//!
//! [`build_alert`] turns the outcome of a pass into one immutable
//! [`CorruptionAlert`] whose severity is derived from the functionality
//! level and the repair outcome. Delivery lives in [`channels`].

pub mod channels;

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::degradation::{classify, DegradationPolicy, FallbackStrategy, FunctionalityLevel, Operation};
use crate::domain::validation::file_name_of;
use crate::domain::ValidationSummary;
use crate::repair::RepairRecord;

pub use channels::{
    build_channels, deliver, AlertChannel, ChannelKind, ChannelOutcome, CiAnnotationChannel,
    ConsoleChannel, DeliveryReport, JsonFileChannel, StepSummaryChannel, StructuredLogChannel,
};

/// Alert severity, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    /// Derive severity from the level and whether a repair was tried and
    /// failed.
    pub fn derive(level: FunctionalityLevel, recovery_failed: bool) -> Self {
        match level {
            FunctionalityLevel::Emergency if recovery_failed => Self::Critical,
            FunctionalityLevel::Emergency => Self::Error,
            FunctionalityLevel::Minimal if recovery_failed => Self::Error,
            FunctionalityLevel::Minimal | FunctionalityLevel::Reduced => Self::Warning,
            FunctionalityLevel::Full => Self::Info,
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Degradation outcome the alert reports on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationContext {
    pub level: FunctionalityLevel,
    pub allowed_operations: Vec<Operation>,
    /// Corrupted files on the critical list.
    pub critical_files: Vec<PathBuf>,
    /// Emergency placeholders written for this pass.
    pub synthesized_files: Vec<PathBuf>,
}

impl DegradationContext {
    pub fn from_strategy(
        strategy: &FallbackStrategy,
        critical_files: Vec<PathBuf>,
        synthesized_files: Vec<PathBuf>,
    ) -> Self {
        let allowed_operations = match &strategy.fallback_data {
            Some(data) => data.allowed_operations.clone(),
            None => Operation::allowed_at(strategy.level),
        };
        Self {
            level: strategy.level,
            allowed_operations,
            critical_files,
            synthesized_files,
        }
    }

    /// Context derived from a summary alone using `policy`.
    pub fn classify(summary: &ValidationSummary, policy: &DegradationPolicy) -> Self {
        let level = classify(summary, policy);
        Self {
            level,
            allowed_operations: Operation::allowed_at(level),
            critical_files: policy.critical_invalid(summary),
            synthesized_files: Vec::new(),
        }
    }
}

/// One incident report, created once and delivered to every channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorruptionAlert {
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub corrupted_files: Vec<PathBuf>,
    pub recovery_attempted: bool,
    pub recovery_successful: bool,
    pub workflow_impact: String,
    pub recommendations: Vec<String>,
    pub technical_details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl CorruptionAlert {
    /// SHA-256 of the serialized alert; stable for a given incident.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hex::encode(hasher.finalize())
    }
}

/// Build the alert for a pass.
///
/// `repairs` holds the records of every repair attempted this pass. Without
/// a degradation context the summary is classified with the default policy.
pub fn build_alert(
    corrupted_files: &[PathBuf],
    summary: &ValidationSummary,
    repairs: &[RepairRecord],
    degradation: Option<&DegradationContext>,
) -> CorruptionAlert {
    let derived;
    let context = match degradation {
        Some(ctx) => ctx,
        None => {
            derived = DegradationContext::classify(summary, &DegradationPolicy::default());
            &derived
        }
    };

    let recovery_attempted = !repairs.is_empty();
    let recovery_successful = recovery_attempted && repairs.iter().all(|r| r.succeeded);
    let severity = AlertSeverity::derive(context.level, recovery_attempted && !recovery_successful);

    CorruptionAlert {
        severity,
        title: title_for(severity, corrupted_files.len()),
        message: message_for(summary, context, repairs),
        corrupted_files: corrupted_files.to_vec(),
        recovery_attempted,
        recovery_successful,
        workflow_impact: impact_for(context),
        recommendations: recommendations_for(severity, repairs, context),
        technical_details: technical_details(summary, repairs, context),
        timestamp: Utc::now(),
    }
}

fn title_for(severity: AlertSeverity, corrupted: usize) -> String {
    match severity {
        AlertSeverity::Critical => {
            format!("CRITICAL: {corrupted} workflow artifact(s) corrupted beyond automatic recovery")
        }
        AlertSeverity::Error => format!("{corrupted} workflow artifact(s) corrupted; running degraded"),
        AlertSeverity::Warning => format!("{corrupted} workflow artifact(s) partially corrupted"),
        AlertSeverity::Info if corrupted == 0 => "Workflow artifacts validated".to_string(),
        AlertSeverity::Info => format!("{corrupted} workflow artifact(s) need attention"),
    }
}

fn message_for(
    summary: &ValidationSummary,
    context: &DegradationContext,
    repairs: &[RepairRecord],
) -> String {
    let mut message = format!(
        "{} of {} artifact(s) failed validation; functionality level is {}.",
        summary.invalid_files, summary.total_files, context.level
    );
    if !repairs.is_empty() {
        let repaired = repairs.iter().filter(|r| r.succeeded).count();
        message.push_str(&format!(
            " Automatic repair fixed {repaired} of {} file(s).",
            repairs.len()
        ));
    }
    if !context.synthesized_files.is_empty() {
        message.push_str(&format!(
            " {} emergency placeholder(s) were written.",
            context.synthesized_files.len()
        ));
    }
    message
}

fn impact_for(context: &DegradationContext) -> String {
    let ops: Vec<&str> = context.allowed_operations.iter().map(|op| op.as_str()).collect();
    match context.level {
        FunctionalityLevel::Full => "No impact; the full workflow runs.".to_string(),
        FunctionalityLevel::Reduced => format!(
            "Reduced functionality: timeline and dashboard updates are suspended. Running: {}.",
            ops.join(", ")
        ),
        FunctionalityLevel::Minimal => format!(
            "Minimal functionality: only {} continue.",
            ops.join(", ")
        ),
        FunctionalityLevel::Emergency => format!(
            "Emergency mode: critical artifacts are unavailable; only {} continue.",
            ops.join(", ")
        ),
    }
}

fn recommendations_for(
    severity: AlertSeverity,
    repairs: &[RepairRecord],
    context: &DegradationContext,
) -> Vec<String> {
    let mut recs = Vec::new();

    match severity {
        AlertSeverity::Critical => {
            recs.push("IMMEDIATE: Halt deployments that depend on the security workflow".to_string());
            recs.push(
                "IMMEDIATE: Restore corrupted critical artifacts from backups or version control"
                    .to_string(),
            );
        }
        AlertSeverity::Error => {
            recs.push("Restore the corrupted artifacts before the next scheduled run".to_string());
        }
        AlertSeverity::Warning => {
            recs.push("Review the corrupted artifacts and restore them when convenient".to_string());
        }
        AlertSeverity::Info => {}
    }

    let failed: Vec<String> = repairs
        .iter()
        .filter(|r| !r.succeeded)
        .map(|r| file_name_of(&r.file_path))
        .collect();
    let repaired = repairs.iter().filter(|r| r.succeeded && !r.repairs_made.is_empty()).count();
    if !failed.is_empty() {
        recs.push(format!(
            "Automatic repair failed for {}; inspect the backups before editing by hand",
            failed.join(", ")
        ));
    }
    if repaired > 0 {
        recs.push(format!(
            "Verify the {repaired} automatically repaired file(s) against their backups"
        ));
    }

    for path in &context.critical_files {
        recs.push(format!(
            "PRIORITY: Restore {} (critical artifact)",
            file_name_of(path)
        ));
    }

    if !context.synthesized_files.is_empty() {
        recs.push("Replace emergency placeholders once the originals are restored".to_string());
    }

    recs
}

fn technical_details(
    summary: &ValidationSummary,
    repairs: &[RepairRecord],
    context: &DegradationContext,
) -> serde_json::Value {
    let errors: serde_json::Map<String, serde_json::Value> = summary
        .invalid_results()
        .map(|r| (r.file_path.display().to_string(), json!(r.errors)))
        .collect();
    let repairs: Vec<serde_json::Value> = repairs
        .iter()
        .map(|r| {
            json!({
                "file_path": r.file_path,
                "backup_path": r.backup_path,
                "original_checksum": r.original_checksum,
                "succeeded": r.succeeded,
                "passes_attempted": r.passes_attempted,
            })
        })
        .collect();

    json!({
        "level": context.level,
        "total_files": summary.total_files,
        "invalid_files": summary.invalid_files,
        "total_errors": summary.total_errors,
        "errors": errors,
        "repairs": repairs,
        "synthesized_files": context.synthesized_files,
    })
}
