use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use artguard_core::alert::channels::{render_console, step_summary_marker};
use artguard_core::alert::{JsonFileChannel, StepSummaryChannel};
use artguard_core::repair::RepairRecord;
use artguard_core::{
    build_alert, deliver, AlertChannel, AlertSeverity, ChannelOutcome, CorruptionAlert,
    DegradationContext, DegradationPolicy, FileType, FunctionalityLevel, GuardError, Operation,
    ValidationResult, ValidationSummary,
};
use async_trait::async_trait;
use chrono::Utc;
use tempfile::tempdir;

fn failed_repair(path: &str) -> RepairRecord {
    RepairRecord {
        file_path: PathBuf::from(path),
        backup_path: PathBuf::from(format!("{path}.bak")),
        original_checksum: "00".repeat(32),
        repairs_made: Vec::new(),
        passes_attempted: vec!["Closed unbalanced double quote on line 2".to_string()],
        succeeded: false,
        repaired_at: Utc::now(),
    }
}

fn emergency_inputs() -> (Vec<PathBuf>, ValidationSummary, DegradationContext) {
    let critical = PathBuf::from("security/findings-registry.json");
    let summary = ValidationSummary::from_results(vec![
        ValidationResult::invalid(
            critical.clone(),
            FileType::Json,
            "JSON parsing error: EOF while parsing a list at line 4 column 0".to_string(),
        ),
        ValidationResult::valid(PathBuf::from("security/notes.md"), FileType::Markdown, Vec::new()),
    ]);
    let context = DegradationContext {
        level: FunctionalityLevel::Emergency,
        allowed_operations: Operation::allowed_at(FunctionalityLevel::Emergency),
        critical_files: vec![critical.clone()],
        synthesized_files: vec![critical.clone()],
    };
    (vec![critical], summary, context)
}

#[test]
fn scenario_d_emergency_with_failed_repair_is_critical() {
    let (corrupted, summary, context) = emergency_inputs();
    let repairs = vec![failed_repair("security/findings-registry.json")];

    let alert = build_alert(&corrupted, &summary, &repairs, Some(&context));
    assert_eq!(alert.severity, AlertSeverity::Critical);
    assert!(alert.recovery_attempted);
    assert!(!alert.recovery_successful);
    assert!(alert.recommendations.iter().any(|r| r.starts_with("IMMEDIATE")));
    assert!(alert
        .recommendations
        .iter()
        .any(|r| r == "PRIORITY: Restore findings-registry.json (critical artifact)"));
    assert_eq!(alert.technical_details["level"], "emergency");
    assert_eq!(
        alert.technical_details["repairs"][0]["passes_attempted"][0],
        "Closed unbalanced double quote on line 2"
    );
}

#[test]
fn emergency_without_repair_is_error() {
    let (corrupted, summary, context) = emergency_inputs();
    let alert = build_alert(&corrupted, &summary, &[], Some(&context));
    assert_eq!(alert.severity, AlertSeverity::Error);
    assert!(!alert.recommendations.iter().any(|r| r.starts_with("IMMEDIATE")));
}

#[test]
fn severity_is_derived_without_context() {
    let summary = ValidationSummary::from_results(vec![
        ValidationResult::invalid(
            PathBuf::from("a.yml"),
            FileType::Yaml,
            "YAML parsing error: x".to_string(),
        ),
        ValidationResult::valid(PathBuf::from("b.yml"), FileType::Yaml, Vec::new()),
        ValidationResult::valid(PathBuf::from("c.yml"), FileType::Yaml, Vec::new()),
    ]);
    let alert = build_alert(&summary.invalid_paths(), &summary, &[], None);
    assert_eq!(alert.severity, AlertSeverity::Warning);

    let context = DegradationContext::classify(&summary, &DegradationPolicy::new(["a.yml"], 0.5));
    let alert = build_alert(
        &summary.invalid_paths(),
        &summary,
        &[failed_repair("a.yml")],
        Some(&context),
    );
    assert_eq!(alert.severity, AlertSeverity::Critical);
}

struct FailingChannel;

#[async_trait]
impl AlertChannel for FailingChannel {
    fn name(&self) -> &str {
        "failing"
    }

    async fn deliver(&self, _alert: &CorruptionAlert) -> artguard_core::Result<ChannelOutcome> {
        Err(GuardError::Io(std::io::Error::other("webhook unreachable")))
    }
}

struct PanickingChannel;

#[async_trait]
impl AlertChannel for PanickingChannel {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn deliver(&self, _alert: &CorruptionAlert) -> artguard_core::Result<ChannelOutcome> {
        panic!("channel bug");
    }
}

struct SlowChannel;

#[async_trait]
impl AlertChannel for SlowChannel {
    fn name(&self) -> &str {
        "slow"
    }

    async fn deliver(&self, _alert: &CorruptionAlert) -> artguard_core::Result<ChannelOutcome> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(ChannelOutcome::Delivered)
    }
}

struct RecordingChannel(&'static str);

#[async_trait]
impl AlertChannel for RecordingChannel {
    fn name(&self) -> &str {
        self.0
    }

    async fn deliver(&self, _alert: &CorruptionAlert) -> artguard_core::Result<ChannelOutcome> {
        Ok(ChannelOutcome::Delivered)
    }
}

#[tokio::test(start_paused = true)]
async fn channel_failure_is_isolated() {
    let (corrupted, summary, context) = emergency_inputs();
    let alert = build_alert(&corrupted, &summary, &[], Some(&context));

    let channels: Vec<Arc<dyn AlertChannel>> = vec![
        Arc::new(RecordingChannel("first")),
        Arc::new(FailingChannel),
        Arc::new(PanickingChannel),
        Arc::new(SlowChannel),
        Arc::new(RecordingChannel("last")),
    ];

    let report = deliver(&alert, &channels, Duration::from_millis(200)).await;
    let success = report.success_map();
    assert_eq!(success.len(), 5);
    assert!(success["first"]);
    assert!(success["last"]);
    assert!(!success["failing"]);
    assert!(!success["panicking"]);
    assert!(!success["slow"]);
    assert_eq!(report.failed_count(), 3);

    match &report.results["failing"] {
        ChannelOutcome::Failed { error } => assert!(error.contains("webhook unreachable")),
        other => panic!("unexpected outcome {other:?}"),
    }
    match &report.results["slow"] {
        ChannelOutcome::Failed { error } => assert!(error.contains("timed out after 200ms")),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn json_file_redelivery_is_idempotent() {
    let dir = tempdir().expect("tempdir");
    let (corrupted, summary, context) = emergency_inputs();
    let alert = build_alert(&corrupted, &summary, &[], Some(&context));
    let channel = JsonFileChannel::new(dir.path().join("alerts"));

    assert_eq!(channel.deliver(&alert).await.expect("first"), ChannelOutcome::Delivered);
    assert_eq!(channel.deliver(&alert).await.expect("second"), ChannelOutcome::Delivered);

    let files: Vec<_> = fs::read_dir(dir.path().join("alerts"))
        .expect("read_dir")
        .collect();
    assert_eq!(files.len(), 1);

    let stored: CorruptionAlert =
        serde_json::from_slice(&fs::read(channel.alert_path(&alert)).expect("read")).expect("json");
    assert_eq!(stored, alert);
}

#[tokio::test]
async fn step_summary_is_skipped_when_unset() {
    let (corrupted, summary, context) = emergency_inputs();
    let alert = build_alert(&corrupted, &summary, &[], Some(&context));
    let channel = StepSummaryChannel::new("ARTGUARD_TEST_STEP_SUMMARY_UNSET");

    let outcome = channel.deliver(&alert).await.expect("deliver");
    assert!(matches!(outcome, ChannelOutcome::Skipped { .. }));
    assert!(outcome.is_success());
}

#[tokio::test]
async fn step_summary_appends_once() {
    let dir = tempdir().expect("tempdir");
    let summary_path = dir.path().join("step-summary.md");
    fs::write(&summary_path, "# Earlier step\n").expect("write");
    std::env::set_var("ARTGUARD_TEST_STEP_SUMMARY_APPEND", &summary_path);

    let (corrupted, summary, context) = emergency_inputs();
    let alert = build_alert(&corrupted, &summary, &[], Some(&context));
    let channel = StepSummaryChannel::new("ARTGUARD_TEST_STEP_SUMMARY_APPEND");

    assert_eq!(channel.deliver(&alert).await.expect("first"), ChannelOutcome::Delivered);
    assert!(matches!(
        channel.deliver(&alert).await.expect("second"),
        ChannelOutcome::Skipped { .. }
    ));

    let text = fs::read_to_string(&summary_path).expect("read");
    assert!(text.starts_with("# Earlier step\n"));
    assert_eq!(text.matches(&step_summary_marker(&alert)).count(), 1);
    assert!(text.contains("PRIORITY: Restore findings-registry.json"));
}

#[test]
fn console_rendering_lists_files_and_recommendations() {
    let (corrupted, summary, context) = emergency_inputs();
    let alert = build_alert(&corrupted, &summary, &[failed_repair("x")], Some(&context));
    let text = render_console(&alert);
    assert!(text.starts_with("[CRITICAL] "));
    assert!(text.contains("corrupted: security/findings-registry.json"));
    assert!(text.contains("Recommendations:\n  - IMMEDIATE"));
}
