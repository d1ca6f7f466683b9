//! Safe automatic repair of corrupted artifacts.
//!
//! A repair call always captures a durable backup and a checksum before it
//! does anything else. Passes then run in order on an in-memory candidate,
//! re-validating after each one; the file on disk is replaced (atomically)
//! only once a candidate validates. When no pass succeeds the original is
//! left untouched and the backup is kept.

pub mod backup;
pub mod passes;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::atomic::write_atomic;
use crate::domain::{GuardError, Result};
use crate::metrics::METRICS;
use crate::obs;
use crate::validator::StructuralValidator;

pub use backup::{content_checksum, write_backup};
pub use passes::{
    default_passes, IndentationNormalization, QuoteBalancing, RepairContext, RepairEdit,
    RepairPass, StructuralCompletion,
};

/// Auditable record of one repair call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairRecord {
    pub file_path: PathBuf,
    pub backup_path: PathBuf,
    /// SHA-256 of the pre-repair content.
    pub original_checksum: String,
    /// Descriptions of the passes that produced the content now on disk.
    pub repairs_made: Vec<String>,
    /// Descriptions of every pass that changed the candidate, whether or not
    /// the repair landed.
    pub passes_attempted: Vec<String>,
    pub succeeded: bool,
    pub repaired_at: DateTime<Utc>,
}

/// Applies the ordered repair passes to invalid files.
pub struct Repairer {
    backup_dir: PathBuf,
    validator: StructuralValidator,
    passes: Vec<Box<dyn RepairPass>>,
}

impl Repairer {
    /// Repairer with the default pass order.
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self::with_passes(backup_dir, default_passes())
    }

    pub fn with_passes(backup_dir: impl Into<PathBuf>, passes: Vec<Box<dyn RepairPass>>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            validator: StructuralValidator::new(),
            passes,
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Attempt to repair `path` exactly once.
    ///
    /// Errors when the file cannot be read or the backup cannot be written.
    /// An unrepairable file, or one whose repaired content cannot be written
    /// back, is `Ok` with `succeeded == false`.
    pub fn repair(&self, path: &Path) -> Result<RepairRecord> {
        let original = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GuardError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                GuardError::Io(e)
            }
        })?;
        METRICS.inc_repairs_attempted();

        let original_checksum = content_checksum(&original);
        let backup_path = write_backup(&self.backup_dir, path, &original)?;

        let mut record = RepairRecord {
            file_path: path.to_path_buf(),
            backup_path,
            original_checksum,
            repairs_made: Vec::new(),
            passes_attempted: Vec::new(),
            succeeded: false,
            repaired_at: Utc::now(),
        };

        let mut current = self.validator.validate_content(path, &original);
        if current.is_valid {
            record.succeeded = true;
            return Ok(self.finish(record));
        }

        let Ok(mut candidate) = String::from_utf8(original) else {
            debug!(path = %path.display(), "content is not UTF-8; no text pass applies");
            return Ok(self.finish(record));
        };

        for pass in &self.passes {
            let edit = {
                let ctx = RepairContext {
                    file_type: current.file_type,
                    diagnostic: current.errors.first().map(String::as_str),
                    location: current.location,
                };
                pass.apply(&candidate, &ctx)
            };
            let Some(edit) = edit else {
                continue;
            };

            debug!(path = %path.display(), pass = pass.name(), change = %edit.description, "repair pass applied");
            candidate = edit.content;
            record.passes_attempted.push(edit.description);

            current = self.validator.validate_content(path, candidate.as_bytes());
            if current.is_valid {
                match write_atomic(path, candidate.as_bytes()) {
                    Ok(()) => {
                        record.repairs_made = record.passes_attempted.clone();
                        record.succeeded = true;
                        METRICS.inc_repairs_succeeded();
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "repaired content could not be written back");
                    }
                }
                break;
            }
        }

        Ok(self.finish(record))
    }

    fn finish(&self, mut record: RepairRecord) -> RepairRecord {
        record.repaired_at = Utc::now();
        obs::emit_repair_finished(
            &record.file_path.display().to_string(),
            record.succeeded,
            record.repairs_made.len(),
            &record.backup_path.display().to_string(),
        );
        record
    }
}
