//! End-to-end guard pass.
//!
//! validate → repair invalid files → re-validate repaired files → classify
//! → plan → synthesize placeholders (EMERGENCY only) → alert → deliver.
//!
//! A pass always completes with a [`GuardReport`] unless a backup cannot be
//! written or an emergency placeholder fails its own validation.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{warn, Instrument};
use uuid::Uuid;

use crate::alert::{
    build_alert, deliver, AlertChannel, AlertSeverity, CorruptionAlert, DegradationContext,
    DeliveryReport,
};
use crate::config::GuardConfig;
use crate::degradation::{classify, plan, DegradationPolicy, FallbackStrategy, FunctionalityLevel};
use crate::domain::{GuardError, Result, ValidationResult, ValidationSummary};
use crate::emergency::EmergencySynthesizer;
use crate::metrics::METRICS;
use crate::obs;
use crate::repair::{RepairRecord, Repairer};
use crate::validator::StructuralValidator;

/// Everything one pass produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardReport {
    pub run_id: String,
    /// Results before any repair.
    pub initial: ValidationSummary,
    pub repairs: Vec<RepairRecord>,
    /// Results after repair; synthesized placeholders are not reflected here.
    pub final_summary: ValidationSummary,
    pub level: FunctionalityLevel,
    pub strategy: FallbackStrategy,
    pub synthesized: Vec<PathBuf>,
    pub alert: CorruptionAlert,
    pub delivery: DeliveryReport,
}

impl GuardReport {
    pub fn exit_code(&self) -> i32 {
        exit_code(self)
    }
}

/// Process exit code for a finished pass.
///
/// 0 when every file ends valid or the level is FULL or REDUCED; otherwise
/// 1, 2 or 3 by alert severity. Any failed channel yields 4.
pub fn exit_code(report: &GuardReport) -> i32 {
    if report.delivery.any_failed() {
        return 4;
    }
    if report.final_summary.all_valid()
        || matches!(
            report.level,
            FunctionalityLevel::Full | FunctionalityLevel::Reduced
        )
    {
        return 0;
    }
    match report.alert.severity {
        AlertSeverity::Info => 0,
        AlertSeverity::Warning => 1,
        AlertSeverity::Error => 2,
        AlertSeverity::Critical => 3,
    }
}

/// Drives the components over one file set.
pub struct ArtifactGuard {
    config: GuardConfig,
    policy: DegradationPolicy,
    validator: StructuralValidator,
    repairer: Repairer,
    synthesizer: EmergencySynthesizer,
}

impl ArtifactGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            policy: config.degradation_policy(),
            repairer: Repairer::new(config.backup_dir.clone()),
            validator: StructuralValidator::new(),
            synthesizer: EmergencySynthesizer::new(),
            config,
        }
    }

    /// Replace the repairer, e.g. to run a custom pass list.
    pub fn with_repairer(mut self, repairer: Repairer) -> Self {
        self.repairer = repairer;
        self
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn policy(&self) -> &DegradationPolicy {
        &self.policy
    }

    /// Run one pass over `paths` and deliver the alert to `channels`.
    pub async fn run(
        &self,
        paths: &[PathBuf],
        channels: &[Arc<dyn AlertChannel>],
    ) -> Result<GuardReport> {
        let run_id = Uuid::new_v4().to_string();
        let span = obs::run_span(&run_id);
        let report = self.run_inner(run_id, paths, channels).instrument(span).await;
        METRICS.flush();
        report
    }

    async fn run_inner(
        &self,
        run_id: String,
        paths: &[PathBuf],
        channels: &[Arc<dyn AlertChannel>],
    ) -> Result<GuardReport> {
        let initial = self
            .validator
            .validate_all(paths, self.config.max_parallel_validations)
            .await;

        let repairs = self.repair_invalid(&initial)?;
        let final_summary = self.revalidate(&initial, &repairs);

        let level = classify(&final_summary, &self.policy);
        let corrupted = final_summary.invalid_paths();
        let strategy = plan(level, &corrupted, &self.policy);

        let critical = self.policy.critical_invalid(&final_summary);
        let synthesized = if level == FunctionalityLevel::Emergency {
            self.synthesizer.synthesize_in_place(&critical)?
        } else {
            Vec::new()
        };

        let context = DegradationContext::from_strategy(&strategy, critical, synthesized.clone());
        let alert = build_alert(&corrupted, &final_summary, &repairs, Some(&context));
        let delivery = deliver(
            &alert,
            channels,
            Duration::from_millis(self.config.delivery_timeout_ms),
        )
        .await;

        let report = GuardReport {
            run_id,
            initial,
            repairs,
            final_summary,
            level,
            strategy,
            synthesized,
            alert,
            delivery,
        };
        obs::emit_guard_finished(
            &report.run_id,
            report.level.as_str(),
            report.alert.severity.as_str(),
            report.exit_code(),
        );
        Ok(report)
    }

    /// Repair every invalid file that exists. A file that cannot be read
    /// stays invalid and the batch continues; only a backup failure aborts
    /// the pass.
    fn repair_invalid(&self, summary: &ValidationSummary) -> Result<Vec<RepairRecord>> {
        let mut records = Vec::new();
        for result in summary.invalid_results() {
            if !result.file_path.exists() {
                continue;
            }
            match self.repairer.repair(&result.file_path) {
                Ok(record) => records.push(record),
                Err(e @ GuardError::BackupFailed { .. }) => return Err(e),
                Err(GuardError::FileNotFound { path }) => {
                    warn!(path = %path.display(), "artifact disappeared before repair");
                }
                Err(e) => {
                    warn!(path = %result.file_path.display(), error = %e, "artifact could not be repaired");
                }
            }
        }
        Ok(records)
    }

    /// Re-check files a repair was attempted on; other results carry over.
    fn revalidate(&self, initial: &ValidationSummary, repairs: &[RepairRecord]) -> ValidationSummary {
        let repaired: BTreeSet<&PathBuf> = repairs.iter().map(|r| &r.file_path).collect();
        let results: Vec<ValidationResult> = initial
            .results
            .iter()
            .map(|r| {
                if repaired.contains(&r.file_path) {
                    self.validator.validate(&r.file_path).with_repair_attempted()
                } else {
                    r.clone()
                }
            })
            .collect();
        ValidationSummary::from_results(results)
    }
}
