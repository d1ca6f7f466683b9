//! Structural validation of workflow artifacts.
//!
//! YAML and JSON get a full grammar parse; a failure becomes one diagnostic
//! prefixed with its grammar (`"YAML parsing error: ..."`). Repair passes and
//! alert text both key off that prefix. Markdown only has to be non-empty
//! UTF-8. After a successful parse, known artifacts are checked for their
//! required top-level keys; a missing key is a warning and never makes the
//! file invalid.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::domain::{shape_for, FileType, ParseLocation, ValidationResult, ValidationSummary};
use crate::metrics::METRICS;
use crate::obs;

/// A grammar-level parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub message: String,
    pub location: Option<ParseLocation>,
}

/// What the required-key check needs from a parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Keys of the first document, `None` when it is not a mapping.
    pub top_level_keys: Option<Vec<String>>,
    pub document_count: usize,
}

/// Parse `content` with the grammar for `file_type`.
///
/// Only YAML and JSON have a grammar; other types parse trivially.
pub fn parse_document(file_type: FileType, content: &str) -> Result<ParsedDocument, ParseFailure> {
    match file_type {
        FileType::Yaml => parse_yaml(content),
        FileType::Json => parse_json(content),
        FileType::Markdown | FileType::Unknown => Ok(ParsedDocument {
            top_level_keys: None,
            document_count: 1,
        }),
    }
}

fn parse_yaml(content: &str) -> Result<ParsedDocument, ParseFailure> {
    let mut first: Option<serde_yaml::Value> = None;
    let mut document_count = 0usize;
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = serde_yaml::Value::deserialize(document).map_err(|e| ParseFailure {
            message: format!("{}: {e}", FileType::Yaml.parse_error_prefix()),
            location: e.location().map(|l| ParseLocation {
                line: l.line(),
                column: l.column(),
            }),
        })?;
        document_count += 1;
        if first.is_none() {
            first = Some(value);
        }
    }

    let top_level_keys = match first {
        Some(serde_yaml::Value::Mapping(map)) => Some(
            map.keys()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect(),
        ),
        _ => None,
    };
    Ok(ParsedDocument {
        top_level_keys,
        document_count,
    })
}

fn parse_json(content: &str) -> Result<ParsedDocument, ParseFailure> {
    let value: serde_json::Value = serde_json::from_str(content).map_err(|e| ParseFailure {
        message: format!("{}: {e}", FileType::Json.parse_error_prefix()),
        location: (e.line() > 0).then(|| ParseLocation {
            line: e.line(),
            column: e.column(),
        }),
    })?;
    let top_level_keys = value.as_object().map(|obj| obj.keys().cloned().collect());
    Ok(ParsedDocument {
        top_level_keys,
        document_count: 1,
    })
}

/// Validates files against their grammar and the known artifact shapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl StructuralValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate the file at `path`.
    ///
    /// A missing file yields a "File not found" error, distinct from any
    /// parse error.
    pub fn validate(&self, path: &Path) -> ValidationResult {
        let result = match std::fs::read(path) {
            Ok(bytes) => self.validate_content(path, &bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ValidationResult::invalid(
                path.to_path_buf(),
                FileType::classify(path, None),
                format!("File not found: {}", path.display()),
            ),
            Err(e) => ValidationResult::invalid(
                path.to_path_buf(),
                FileType::classify(path, None),
                format!("Unable to read file: {e}"),
            ),
        };

        METRICS.inc_files_validated();
        if !result.is_valid {
            METRICS.inc_files_invalid();
            debug!(path = %path.display(), errors = ?result.errors, "artifact invalid");
        }
        result
    }

    /// Validate in-memory `bytes` as if they were the content of `path`.
    pub fn validate_content(&self, path: &Path, bytes: &[u8]) -> ValidationResult {
        let file_type = FileType::classify(path, Some(bytes));
        let owned = path.to_path_buf();

        if file_type == FileType::Unknown {
            return ValidationResult::invalid(
                owned,
                file_type,
                format!(
                    "{}: no recognised extension and no content to infer a grammar from",
                    file_type.parse_error_prefix()
                ),
            );
        }

        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                return ValidationResult::invalid(
                    owned,
                    file_type,
                    format!("{}: content is not valid UTF-8 ({e})", file_type.parse_error_prefix()),
                )
            }
        };

        if file_type == FileType::Markdown {
            if text.trim().is_empty() {
                return ValidationResult::invalid(
                    owned,
                    file_type,
                    format!("{}: file is empty", file_type.parse_error_prefix()),
                );
            }
            return ValidationResult::valid(owned, file_type, Vec::new());
        }

        match parse_document(file_type, text) {
            Ok(document) => {
                debug!(path = %path.display(), documents = document.document_count, "artifact parsed");
                let warnings = required_key_warnings(path, &document);
                ValidationResult::valid(owned, file_type, warnings)
            }
            Err(failure) => ValidationResult::invalid(owned, file_type, failure.message)
                .with_location(failure.location),
        }
    }

    /// Validate every path, at most `max_parallel` at a time.
    ///
    /// Never stops at the first failure; results keep the input order.
    pub async fn validate_all(&self, paths: &[PathBuf], max_parallel: usize) -> ValidationSummary {
        let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
        let mut join_set = JoinSet::new();

        for (idx, path) in paths.iter().cloned().enumerate() {
            let permit = Arc::clone(&semaphore).acquire_owned().await.ok();
            let validator = *self;
            join_set.spawn_blocking(move || {
                let _permit = permit;
                (idx, validator.validate(&path))
            });
        }

        let mut ordered: Vec<Option<ValidationResult>> = vec![None; paths.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, result)) => ordered[idx] = Some(result),
                Err(e) => warn!(error = %e, "validation task failed"),
            }
        }

        let results: Vec<ValidationResult> = paths
            .iter()
            .zip(ordered)
            .map(|(path, slot)| {
                slot.unwrap_or_else(|| {
                    ValidationResult::invalid(
                        path.clone(),
                        FileType::classify(path, None),
                        "Validation task aborted before producing a result".to_string(),
                    )
                })
            })
            .collect();

        let summary = ValidationSummary::from_results(results);
        obs::emit_validation_finished(summary.total_files, summary.invalid_files, summary.total_errors);
        summary
    }
}

fn required_key_warnings(path: &Path, document: &ParsedDocument) -> Vec<String> {
    let Some(shape) = shape_for(path) else {
        return Vec::new();
    };
    match &document.top_level_keys {
        None => vec![format!(
            "Expected a mapping at the top level of {}",
            shape.file_name
        )],
        Some(keys) => shape
            .key_names()
            .filter(|required| !keys.iter().any(|k| k == required))
            .map(|missing| format!("Missing required key '{missing}'"))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(name: &str, content: &str) -> ValidationResult {
        StructuralValidator::new().validate_content(Path::new(name), content.as_bytes())
    }

    #[test]
    fn yaml_error_is_prefixed_and_located() {
        let result = check("a.yml", "key: [unclosed\nother: 1\n");
        assert!(!result.is_valid);
        assert!(result.errors[0].starts_with("YAML parsing error"));
        assert!(result.location.is_some());
    }

    #[test]
    fn json_error_is_prefixed() {
        let result = check("a.json", "{\"a\": 1,,}");
        assert!(!result.is_valid);
        assert!(result.errors[0].starts_with("JSON parsing error"));
        assert_eq!(result.location.map(|l| l.line), Some(1));
    }

    #[test]
    fn multi_document_yaml_is_valid() {
        let result = check("a.yml", "a: 1\n---\nb: 2\n");
        assert!(result.is_valid);
        let parsed = parse_document(FileType::Yaml, "a: 1\n---\nb: 2\n---\nc: 3\n").unwrap();
        assert_eq!(parsed.document_count, 3);
        assert_eq!(parsed.top_level_keys, Some(vec!["a".to_string()]));
    }

    #[test]
    fn markdown_needs_text_only() {
        assert!(check("README.md", "# Title\n\n{ not json").is_valid);
        let empty = check("README.md", "  \n");
        assert!(!empty.is_valid);
        assert!(empty.errors[0].contains("empty"));
    }

    #[test]
    fn missing_key_is_warning_not_error() {
        let result = check("remediation-timeline.yml", "metadata:\n  owner: sec\n");
        assert!(result.is_valid);
        assert_eq!(result.warnings, vec!["Missing required key 'timeline'".to_string()]);
    }

    #[test]
    fn non_mapping_shape_is_warning() {
        let result = check("findings-registry.json", "[1, 2, 3]");
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("mapping"));
    }

    #[test]
    fn unknown_extension_sniffs_json() {
        let result = check("registry.data", "{\"a\": 1}");
        assert!(result.is_valid);
        assert_eq!(result.file_type, FileType::Json);
    }

    #[test]
    fn invalid_utf8_keeps_grammar_prefix() {
        let result =
            StructuralValidator::new().validate_content(Path::new("a.yml"), &[b'a', b':', 0xff]);
        assert!(!result.is_valid);
        assert!(result.errors[0].starts_with("YAML parsing error"));
    }
}
