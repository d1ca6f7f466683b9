//! Structured observability hooks for guard pass lifecycle events.
//!
//! This module provides:
//! - Run-scoped tracing spans via the `GuardSpan` RAII guard
//! - One emission function per lifecycle event, each tagged with a stable
//!   `event` field
//!
//! Verbosity follows `RUST_LOG`; pass `--json` to the CLI for JSON lines.

use tracing::{info, warn};

/// RAII guard that enters a run-scoped tracing span for the duration of a pass.
///
/// # Example
///
/// ```ignore
/// let _span = GuardSpan::enter("5f0c...");
/// // every event below is tagged with run_id = "5f0c..."
/// ```
pub struct GuardSpan {
    _span: tracing::span::EnteredSpan,
}

impl GuardSpan {
    /// Create and enter a span tagged with the run_id.
    pub fn enter(run_id: &str) -> Self {
        Self {
            _span: run_span(run_id).entered(),
        }
    }
}

/// The run-scoped span, unentered, for instrumenting async work.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("artguard.run", run_id = %run_id)
}

/// Emit event: a validation pass completed.
pub fn emit_validation_finished(total_files: usize, invalid_files: usize, total_errors: usize) {
    info!(
        event = "validation.finished",
        total_files = total_files,
        invalid_files = invalid_files,
        total_errors = total_errors,
    );
}

/// Emit event: one repair call completed.
pub fn emit_repair_finished(path: &str, succeeded: bool, repairs_made: usize, backup: &str) {
    info!(
        event = "repair.finished",
        path = %path,
        succeeded = succeeded,
        repairs_made = repairs_made,
        backup = %backup,
    );
}

/// Emit event: the batch was classified into a functionality level.
pub fn emit_level_classified(level: &str, invalid_files: usize, critical_invalid: usize) {
    info!(
        event = "degradation.classified",
        level = %level,
        invalid_files = invalid_files,
        critical_invalid = critical_invalid,
    );
}

/// Emit event: an emergency placeholder was written (warning level).
pub fn emit_emergency_synthesized(path: &str) {
    warn!(event = "emergency.synthesized", path = %path);
}

/// Emit event: an alert was handed to its channels.
pub fn emit_alert_delivered(severity: &str, delivered: usize, failed: usize) {
    info!(
        event = "alert.delivered",
        severity = %severity,
        delivered = delivered,
        failed = failed,
    );
}

/// Emit event: a single channel failed (warning level).
pub fn emit_channel_failed(channel: &str, error: &dyn std::fmt::Display) {
    warn!(event = "alert.channel_failed", channel = %channel, error = %error);
}

/// Emit event: the whole pass completed.
pub fn emit_guard_finished(run_id: &str, level: &str, severity: &str, exit_code: i32) {
    info!(
        event = "guard.finished",
        run_id = %run_id,
        level = %level,
        severity = %severity,
        exit_code = exit_code,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_span_create() {
        let _span = GuardSpan::enter("test-run-id");
        emit_validation_finished(3, 1, 1);
    }
}
