use std::path::PathBuf;

use artguard_core::{
    classify, execute_degraded, plan, DegradationPolicy, FileType, FunctionalityLevel, Operation,
    ValidationResult, ValidationSummary,
};

fn result(name: &str, valid: bool) -> ValidationResult {
    let path = PathBuf::from("security").join(name);
    if valid {
        ValidationResult::valid(path, FileType::Yaml, Vec::new())
    } else {
        ValidationResult::invalid(path, FileType::Yaml, "YAML parsing error: bad".to_string())
    }
}

fn summary(files: &[(&str, bool)]) -> ValidationSummary {
    ValidationSummary::from_results(files.iter().map(|(n, ok)| result(n, *ok)).collect())
}

#[test]
fn scenario_b_critical_failure_plans_placeholder() {
    let policy = DegradationPolicy::default();
    let s = summary(&[("remediation-timeline.yml", false), ("notes.yml", true)]);

    let level = classify(&s, &policy);
    assert_eq!(level, FunctionalityLevel::Emergency);

    let strategy = plan(level, &s.invalid_paths(), &policy);
    assert!(strategy.can_continue);
    let data = strategy.fallback_data.expect("fallback data");
    assert_eq!(data.emergency_placeholders.len(), 1);
    let placeholder = &data.emergency_placeholders[0];
    assert_eq!(
        placeholder.file_path,
        PathBuf::from("security/remediation-timeline.yml")
    );
    assert_eq!(placeholder.payload["mode"], "emergency");
    assert!(placeholder.payload["timeline"].is_array());
    assert_eq!(
        data.allowed_operations,
        vec![Operation::Notification, Operation::StatusReport]
    );
}

#[test]
fn scenario_c_volume_thresholds() {
    let policy = DegradationPolicy::default();

    let three_of_five = summary(&[
        ("a.yml", false),
        ("b.yml", false),
        ("c.yml", false),
        ("d.yml", true),
        ("e.yml", true),
    ]);
    assert_eq!(classify(&three_of_five, &policy), FunctionalityLevel::Minimal);

    let one_of_four = summary(&[("a.yml", false), ("b.yml", true), ("c.yml", true), ("d.yml", true)]);
    assert_eq!(classify(&one_of_four, &policy), FunctionalityLevel::Reduced);

    let none = summary(&[("a.yml", true), ("b.yml", true)]);
    assert_eq!(classify(&none, &policy), FunctionalityLevel::Full);
}

#[test]
fn criticality_dominates_volume() {
    let policy = DegradationPolicy::default();
    for valid_others in [0usize, 1, 5, 50] {
        let mut files = vec![("scan-config.yml".to_string(), false)];
        files.extend((0..valid_others).map(|i| (format!("ok-{i}.yml"), true)));
        let s = ValidationSummary::from_results(
            files.iter().map(|(n, ok)| result(n, *ok)).collect(),
        );
        assert_eq!(classify(&s, &policy), FunctionalityLevel::Emergency);
    }
}

#[test]
fn caller_supplied_critical_set() {
    let policy = DegradationPolicy::new(["inventory.json"], 0.5);
    let s = summary(&[("scan-config.yml", false), ("inventory.json", true), ("x.yml", true)]);
    assert_eq!(classify(&s, &policy), FunctionalityLevel::Reduced);

    let s = summary(&[("inventory.json", false), ("x.yml", true), ("y.yml", true)]);
    assert_eq!(classify(&s, &policy), FunctionalityLevel::Emergency);
}

#[test]
fn every_level_can_continue() {
    let policy = DegradationPolicy::default();
    let corrupted = vec![PathBuf::from("security/findings-registry.json")];
    for level in [
        FunctionalityLevel::Full,
        FunctionalityLevel::Reduced,
        FunctionalityLevel::Minimal,
        FunctionalityLevel::Emergency,
    ] {
        let strategy = plan(level, &corrupted, &policy);
        assert!(strategy.can_continue, "{level} must continue");
        assert_eq!(strategy.fallback_data.is_some(), level != FunctionalityLevel::Full);
        assert!(execute_degraded(&strategy).success);
    }
}

#[test]
fn execute_degraded_surfaces_plan() {
    let policy = DegradationPolicy::default();
    let corrupted = vec![PathBuf::from("a.yml"), PathBuf::from("b.json"), PathBuf::from("c.md")];
    let strategy = plan(FunctionalityLevel::Minimal, &corrupted, &policy);

    let exec = execute_degraded(&strategy);
    assert_eq!(exec.level, FunctionalityLevel::Minimal);
    assert_eq!(
        exec.operations_performed,
        vec!["security_scan", "notification", "status_report"]
    );
    assert_eq!(exec.warnings.len(), 3);
}

#[test]
fn emergency_execution_mentions_placeholders() {
    let policy = DegradationPolicy::default();
    let corrupted = vec![PathBuf::from("findings-registry.json"), PathBuf::from("notes.md")];
    let strategy = plan(FunctionalityLevel::Emergency, &corrupted, &policy);

    let exec = execute_degraded(&strategy);
    assert_eq!(exec.warnings.len(), 3);
    assert!(exec.warnings[2].contains("emergency placeholder"));
}
