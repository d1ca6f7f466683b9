use std::fs;

use artguard_core::{FileType, StructuralValidator};
use tempfile::tempdir;

#[test]
fn validate_is_deterministic() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("scan-config.yml");
    fs::write(&path, "scanners: [trivy\ntargets: []\n").expect("write");

    let validator = StructuralValidator::new();
    let first = validator.validate(&path);
    let second = validator.validate(&path);
    assert_eq!(first, second);
    assert!(!first.is_valid);
}

#[test]
fn parse_errors_carry_grammar_prefix() {
    let dir = tempdir().expect("tempdir");
    let yaml = dir.path().join("remediation-timeline.yml");
    let json = dir.path().join("findings-registry.json");
    fs::write(&yaml, "metadata:\n  owner: \"sec\ntimeline: []\n").expect("write");
    fs::write(&json, "{\"metadata\": {}, \"findings\": [").expect("write");

    let validator = StructuralValidator::new();
    let y = validator.validate(&yaml);
    let j = validator.validate(&json);
    assert_eq!(y.file_type, FileType::Yaml);
    assert!(y.errors[0].starts_with("YAML parsing error: "), "{:?}", y.errors);
    assert_eq!(j.file_type, FileType::Json);
    assert!(j.errors[0].starts_with("JSON parsing error: "), "{:?}", j.errors);
}

#[test]
fn missing_file_is_not_a_parse_error() {
    let dir = tempdir().expect("tempdir");
    let result = StructuralValidator::new().validate(&dir.path().join("scan-config.yml"));
    assert!(!result.is_valid);
    assert!(result.errors[0].starts_with("File not found"));
    assert!(!result.errors[0].contains("parsing error"));
}

#[test]
fn missing_required_key_is_only_a_warning() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("findings-registry.json");
    fs::write(&path, "{\"metadata\": {\"version\": 2}}").expect("write");

    let result = StructuralValidator::new().validate(&path);
    assert!(result.is_valid);
    assert!(result.errors.is_empty());
    assert_eq!(result.warnings, vec!["Missing required key 'findings'".to_string()]);
}

#[test]
fn non_mapping_top_level_is_warned() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("scan-config.yml");
    fs::write(&path, "- trivy\n- grype\n").expect("write");

    let result = StructuralValidator::new().validate(&path);
    assert!(result.is_valid);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].starts_with("Expected a mapping at the top level"));
}

#[test]
fn every_document_of_a_stream_is_parsed() {
    let dir = tempdir().expect("tempdir");
    let good = dir.path().join("multi.yml");
    let bad = dir.path().join("multi-bad.yml");
    fs::write(&good, "a: 1\n---\nb: 2\n").expect("write");
    fs::write(&bad, "a: 1\n---\nb: [2\n").expect("write");

    let validator = StructuralValidator::new();
    assert!(validator.validate(&good).is_valid);
    assert!(!validator.validate(&bad).is_valid);
}

#[test]
fn markdown_needs_only_non_empty_utf8() {
    let dir = tempdir().expect("tempdir");
    let ok = dir.path().join("README.md");
    let empty = dir.path().join("EMPTY.md");
    let binary = dir.path().join("BIN.md");
    fs::write(&ok, "# Findings\n\n| a | b\n").expect("write");
    fs::write(&empty, "  \n\n").expect("write");
    fs::write(&binary, [0xff, 0xfe, 0x00]).expect("write");

    let validator = StructuralValidator::new();
    assert!(validator.validate(&ok).is_valid);
    assert!(!validator.validate(&empty).is_valid);
    let bin = validator.validate(&binary);
    assert!(!bin.is_valid);
    assert!(bin.errors[0].starts_with("Markdown validation error"));
}

#[test]
fn unknown_extension_is_sniffed() {
    let dir = tempdir().expect("tempdir");
    let json_like = dir.path().join("artifact.data");
    let yaml_like = dir.path().join("artifact.conf");
    fs::write(&json_like, "  {\"a\": 1}").expect("write");
    fs::write(&yaml_like, "a: 1\n").expect("write");

    let validator = StructuralValidator::new();
    assert_eq!(validator.validate(&json_like).file_type, FileType::Json);
    assert_eq!(validator.validate(&yaml_like).file_type, FileType::Yaml);
}

#[tokio::test]
async fn validate_all_is_exhaustive_and_ordered() {
    let dir = tempdir().expect("tempdir");
    let mut paths = Vec::new();
    for i in 0..12 {
        let path = dir.path().join(format!("artifact-{i:02}.yml"));
        let body = if i % 3 == 0 { "a: [1\n" } else { "a: 1\n" };
        fs::write(&path, body).expect("write");
        paths.push(path);
    }
    paths.push(dir.path().join("missing.json"));

    let summary = StructuralValidator::new().validate_all(&paths, 3).await;
    assert_eq!(summary.total_files, 13);
    assert_eq!(summary.invalid_files, 5);
    assert_eq!(summary.valid_files, 8);
    assert_eq!(summary.total_errors, 5);

    let order: Vec<_> = summary.results.iter().map(|r| r.file_path.clone()).collect();
    assert_eq!(order, paths);
}
