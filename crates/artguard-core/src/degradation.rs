//! Graceful degradation planning.
//!
//! Classifies a validation pass into a [`FunctionalityLevel`] and builds the
//! [`FallbackStrategy`] downstream stages follow. Every strategy can
//! continue; escalation happens through alert severity, never by refusing
//! to run.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::validation::file_name_of;
use crate::domain::{ValidationSummary, DEFAULT_CRITICAL_FILES};
use crate::emergency::placeholder_document;
use crate::obs;

/// How much of the downstream workflow can still run. Ordered from most to
/// least capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionalityLevel {
    Full,
    Reduced,
    Minimal,
    Emergency,
}

impl FunctionalityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "FULL",
            Self::Reduced => "REDUCED",
            Self::Minimal => "MINIMAL",
            Self::Emergency => "EMERGENCY",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Full => "All artifacts are valid; the full workflow runs",
            Self::Reduced => {
                "Some non-critical artifacts are corrupted; the workflow runs with reduced functionality"
            }
            Self::Minimal => {
                "Most artifacts are corrupted; only scanning, notifications and status reporting run"
            }
            Self::Emergency => {
                "Critical artifacts are corrupted; the workflow runs on emergency placeholders"
            }
        }
    }
}

impl fmt::Display for FunctionalityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Downstream operations a level may allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    SecurityScan,
    FindingTriage,
    TimelineUpdate,
    ReportGeneration,
    DashboardUpdate,
    Notification,
    StatusReport,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::SecurityScan,
        Operation::FindingTriage,
        Operation::TimelineUpdate,
        Operation::ReportGeneration,
        Operation::DashboardUpdate,
        Operation::Notification,
        Operation::StatusReport,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SecurityScan => "security_scan",
            Self::FindingTriage => "finding_triage",
            Self::TimelineUpdate => "timeline_update",
            Self::ReportGeneration => "report_generation",
            Self::DashboardUpdate => "dashboard_update",
            Self::Notification => "notification",
            Self::StatusReport => "status_report",
        }
    }

    /// Operations allowed at `level`; each level's set is a subset of the
    /// previous one.
    pub fn allowed_at(level: FunctionalityLevel) -> Vec<Operation> {
        match level {
            FunctionalityLevel::Full => Self::ALL.to_vec(),
            FunctionalityLevel::Reduced => vec![
                Self::SecurityScan,
                Self::FindingTriage,
                Self::ReportGeneration,
                Self::Notification,
                Self::StatusReport,
            ],
            FunctionalityLevel::Minimal => {
                vec![Self::SecurityScan, Self::Notification, Self::StatusReport]
            }
            FunctionalityLevel::Emergency => vec![Self::Notification, Self::StatusReport],
        }
    }
}

/// Critical file names and the MINIMAL threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationPolicy {
    pub critical_files: BTreeSet<String>,
    /// Invalid fraction at or above which a batch is MINIMAL.
    pub minimal_invalid_ratio: f64,
}

impl Default for DegradationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CRITICAL_FILES.iter().map(|s| s.to_string()), 0.5)
    }
}

impl DegradationPolicy {
    pub fn new<I, S>(critical_files: I, minimal_invalid_ratio: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            critical_files: critical_files.into_iter().map(Into::into).collect(),
            minimal_invalid_ratio,
        }
    }

    /// Whether `path`'s file name is on the critical list.
    pub fn is_critical(&self, path: &Path) -> bool {
        self.critical_files.contains(&file_name_of(path))
    }

    /// Invalid files of `summary` that are critical.
    pub fn critical_invalid(&self, summary: &ValidationSummary) -> Vec<PathBuf> {
        summary
            .invalid_results()
            .filter(|r| self.is_critical(&r.file_path))
            .map(|r| r.file_path.clone())
            .collect()
    }
}

/// Placeholder content planned for one corrupted critical file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyPlaceholder {
    pub file_path: PathBuf,
    pub payload: serde_json::Value,
}

/// Pre-encoded continuation data for a degraded level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackData {
    pub allowed_operations: Vec<Operation>,
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emergency_placeholders: Vec<EmergencyPlaceholder>,
}

/// Continuation plan attached to a functionality level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackStrategy {
    pub level: FunctionalityLevel,
    pub description: String,
    pub can_continue: bool,
    pub fallback_data: Option<FallbackData>,
}

/// Result of interpreting a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedExecution {
    pub success: bool,
    pub level: FunctionalityLevel,
    pub operations_performed: Vec<String>,
    pub warnings: Vec<String>,
}

/// Classify a pass, first match wins: any invalid critical file is
/// EMERGENCY; an invalid fraction at or above the threshold is MINIMAL; any
/// other invalid file is REDUCED; otherwise FULL.
pub fn classify(summary: &ValidationSummary, policy: &DegradationPolicy) -> FunctionalityLevel {
    let critical_invalid = policy.critical_invalid(summary).len();
    let level = if critical_invalid > 0 {
        FunctionalityLevel::Emergency
    } else if summary.invalid_files == 0 {
        FunctionalityLevel::Full
    } else if summary.invalid_ratio() >= policy.minimal_invalid_ratio {
        FunctionalityLevel::Minimal
    } else {
        FunctionalityLevel::Reduced
    };

    obs::emit_level_classified(level.as_str(), summary.invalid_files, critical_invalid);
    level
}

/// Build the continuation plan for `level`.
pub fn plan(
    level: FunctionalityLevel,
    corrupted_files: &[PathBuf],
    policy: &DegradationPolicy,
) -> FallbackStrategy {
    let fallback_data = match level {
        FunctionalityLevel::Full => None,
        _ => {
            let warnings = corrupted_files
                .iter()
                .map(|p| {
                    format!(
                        "{} is corrupted; operations depending on it are suspended",
                        file_name_of(p)
                    )
                })
                .collect();

            let emergency_placeholders = if level == FunctionalityLevel::Emergency {
                let generated_at = Utc::now();
                corrupted_files
                    .iter()
                    .filter(|p| policy.is_critical(p))
                    .map(|p| EmergencyPlaceholder {
                        file_path: p.clone(),
                        payload: placeholder_document(p, generated_at),
                    })
                    .collect()
            } else {
                Vec::new()
            };

            Some(FallbackData {
                allowed_operations: Operation::allowed_at(level),
                warnings,
                emergency_placeholders,
            })
        }
    };

    FallbackStrategy {
        level,
        description: level.description().to_string(),
        can_continue: true,
        fallback_data,
    }
}

/// Surface the operations and warnings a strategy encodes.
///
/// Performs no I/O; the operations themselves are run by the caller.
pub fn execute_degraded(strategy: &FallbackStrategy) -> DegradedExecution {
    let (operations_performed, mut warnings) = match &strategy.fallback_data {
        None => (
            Operation::allowed_at(strategy.level)
                .into_iter()
                .map(|op| op.as_str().to_string())
                .collect(),
            Vec::new(),
        ),
        Some(data) => (
            data.allowed_operations
                .iter()
                .map(|op| op.as_str().to_string())
                .collect(),
            data.warnings.clone(),
        ),
    };

    if let Some(data) = &strategy.fallback_data {
        for placeholder in &data.emergency_placeholders {
            warnings.push(format!(
                "{} replaced by an emergency placeholder",
                placeholder.file_path.display()
            ));
        }
    }

    DegradedExecution {
        success: strategy.can_continue,
        level: strategy.level,
        operations_performed,
        warnings,
    }
}
