//! Error taxonomy for artifact guarding.
//!
//! Per-file problems (parse failures, missing keys, exhausted repairs) are
//! values inside [`ValidationResult`](super::ValidationResult) and
//! [`RepairRecord`](crate::repair::RepairRecord). Only the variants below
//! cross a function boundary as `Err`.

use std::path::PathBuf;

/// Hard failures of a guard run.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("backup of {} failed: {source}", path.display())]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("emergency placeholder {} could not be produced: {}", path.display(), errors.join("; "))]
    SynthesisFailure { path: PathBuf, errors: Vec<String> },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("yaml serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for guard operations.
pub type Result<T> = std::result::Result<T, GuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_display() {
        let err = GuardError::FileNotFound {
            path: PathBuf::from("artifacts/remediation-timeline.yml"),
        };
        assert!(err.to_string().contains("file not found"));
        assert!(err.to_string().contains("remediation-timeline.yml"));
    }

    #[test]
    fn test_synthesis_failure_lists_errors() {
        let err = GuardError::SynthesisFailure {
            path: PathBuf::from("scan-config.yml"),
            errors: vec!["YAML parsing error: bad".to_string(), "other".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("scan-config.yml"));
        assert!(msg.contains("YAML parsing error: bad; other"));
    }

    #[test]
    fn test_backup_failed_keeps_source() {
        let err = GuardError::BackupFailed {
            path: PathBuf::from("/ro/backups"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        };
        assert!(err.to_string().contains("read-only"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
