//! Validation records produced by one pass over the artifact set.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::FileType;

/// 1-based position of a parse failure, when the grammar reports one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseLocation {
    pub line: usize,
    pub column: usize,
}

/// Outcome of validating one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub file_path: PathBuf,
    pub is_valid: bool,
    pub file_type: FileType,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub repair_attempted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ParseLocation>,
}

impl ValidationResult {
    /// Passing result; `warnings` never affect validity.
    pub fn valid(file_path: PathBuf, file_type: FileType, warnings: Vec<String>) -> Self {
        Self {
            file_path,
            is_valid: true,
            file_type,
            errors: Vec::new(),
            warnings,
            repair_attempted: false,
            location: None,
        }
    }

    /// Failing result carrying a single error.
    pub fn invalid(file_path: PathBuf, file_type: FileType, error: String) -> Self {
        Self {
            file_path,
            is_valid: false,
            file_type,
            errors: vec![error],
            warnings: Vec::new(),
            repair_attempted: false,
            location: None,
        }
    }

    /// Attach the parse position reported by the grammar.
    pub fn with_location(mut self, location: Option<ParseLocation>) -> Self {
        self.location = location;
        self
    }

    /// Mark this result as produced after a repair attempt.
    pub fn with_repair_attempted(mut self) -> Self {
        self.repair_attempted = true;
        self
    }

    /// File name component, or the whole path when there is none.
    pub fn file_name(&self) -> String {
        file_name_of(&self.file_path)
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Aggregate of one validation pass; recomputed every pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_files: usize,
    pub valid_files: usize,
    pub invalid_files: usize,
    pub total_errors: usize,
    pub results: Vec<ValidationResult>,
}

impl ValidationSummary {
    /// Aggregate `results`, keeping their order.
    pub fn from_results(results: Vec<ValidationResult>) -> Self {
        let total_files = results.len();
        let valid_files = results.iter().filter(|r| r.is_valid).count();
        let total_errors = results.iter().map(|r| r.errors.len()).sum();
        Self {
            total_files,
            valid_files,
            invalid_files: total_files - valid_files,
            total_errors,
            results,
        }
    }

    /// True when no file failed.
    pub fn all_valid(&self) -> bool {
        self.invalid_files == 0
    }

    /// Fraction of files that are invalid; `0.0` for an empty set.
    pub fn invalid_ratio(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            self.invalid_files as f64 / self.total_files as f64
        }
    }

    /// Iterate the failing results in input order.
    pub fn invalid_results(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.is_valid)
    }

    /// Paths of the failing files in input order.
    pub fn invalid_paths(&self) -> Vec<PathBuf> {
        self.invalid_results().map(|r| r.file_path.clone()).collect()
    }

    /// Result recorded for `path`, if it was part of the pass.
    pub fn result_for(&self, path: &Path) -> Option<&ValidationResult> {
        self.results.iter().find(|r| r.file_path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, valid: bool) -> ValidationResult {
        if valid {
            ValidationResult::valid(PathBuf::from(name), FileType::Yaml, Vec::new())
        } else {
            ValidationResult::invalid(
                PathBuf::from(name),
                FileType::Yaml,
                "YAML parsing error: bad".to_string(),
            )
        }
    }

    #[test]
    fn summary_counts() {
        let summary = ValidationSummary::from_results(vec![
            result("a.yml", true),
            result("b.yml", false),
            result("c.yml", false),
            result("d.yml", true),
        ]);
        assert_eq!(summary.total_files, 4);
        assert_eq!(summary.valid_files, 2);
        assert_eq!(summary.invalid_files, 2);
        assert_eq!(summary.total_errors, 2);
        assert!((summary.invalid_ratio() - 0.5).abs() < f64::EPSILON);
        assert_eq!(
            summary.invalid_paths(),
            vec![PathBuf::from("b.yml"), PathBuf::from("c.yml")]
        );
    }

    #[test]
    fn empty_summary_is_all_valid() {
        let summary = ValidationSummary::from_results(Vec::new());
        assert!(summary.all_valid());
        assert_eq!(summary.invalid_ratio(), 0.0);
    }

    #[test]
    fn location_is_omitted_when_absent() {
        let v = serde_json::to_value(result("a.yml", true)).unwrap();
        assert!(v.get("location").is_none());
        assert_eq!(v["file_type"], "yaml");
    }
}
