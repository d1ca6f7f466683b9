//! Emergency placeholder synthesis for unrepairable critical artifacts.
//!
//! A placeholder carries a generation timestamp, a `mode: emergency` marker
//! and an empty instance of the artifact's known shape. Every file written
//! here is re-validated before it is reported; a placeholder that cannot be
//! written or does not validate is a [`GuardError::SynthesisFailure`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::atomic::write_atomic;
use crate::domain::{shape_for, FileType, GuardError, Result};
use crate::metrics::METRICS;
use crate::obs;
use crate::validator::StructuralValidator;

/// Marker value of the `mode` key in every placeholder.
pub const EMERGENCY_MODE: &str = "emergency";

/// Placeholder document for `path` as a JSON value.
///
/// Keys of the artifact's shape map to empty mappings or sequences; files
/// without a known shape get only the timestamp and mode marker.
pub fn placeholder_document(path: &Path, generated_at: DateTime<Utc>) -> Value {
    let mut doc = Map::new();
    doc.insert(
        "generated_at".to_string(),
        Value::String(generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    doc.insert("mode".to_string(), Value::String(EMERGENCY_MODE.to_string()));
    if let Some(shape) = shape_for(path) {
        for (key, empty) in shape.required_keys {
            doc.insert(key.to_string(), empty.to_json());
        }
    }
    Value::Object(doc)
}

/// Render a placeholder document in the grammar `path` is read with.
pub fn render_placeholder(path: &Path, document: &Value) -> Result<String> {
    match FileType::classify(path, None) {
        FileType::Json => {
            let mut text = serde_json::to_string_pretty(document)?;
            text.push('\n');
            Ok(text)
        }
        FileType::Markdown => {
            let generated_at = document
                .get("generated_at")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Ok(format!(
                "# Emergency placeholder\n\n\
                 - mode: {EMERGENCY_MODE}\n\
                 - generated_at: {generated_at}\n\n\
                 The original artifact was corrupted and could not be repaired. \
                 Restore it from the backup directory.\n"
            ))
        }
        FileType::Yaml | FileType::Unknown => Ok(serde_yaml::to_string(document)?),
    }
}

/// Writes self-valid placeholder files.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmergencySynthesizer {
    validator: StructuralValidator,
}

impl EmergencySynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one placeholder per path into `output_dir`, keeping each file's
    /// name. Callers pass only the corrupted critical files.
    ///
    /// Destinations are checked before anything is written: two sources
    /// sharing a file name are rejected instead of overwriting each other.
    pub fn synthesize(&self, corrupted: &[PathBuf], output_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut destinations: BTreeMap<PathBuf, &PathBuf> = BTreeMap::new();
        let mut plan = Vec::with_capacity(corrupted.len());
        for source in corrupted {
            let Some(name) = source.file_name() else {
                return Err(GuardError::SynthesisFailure {
                    path: source.clone(),
                    errors: vec!["path has no file name".to_string()],
                });
            };
            let dest = output_dir.join(name);
            if let Some(earlier) = destinations.insert(dest.clone(), source) {
                return Err(GuardError::SynthesisFailure {
                    path: dest,
                    errors: vec![format!(
                        "{} and {} share a placeholder destination",
                        earlier.display(),
                        source.display()
                    )],
                });
            }
            plan.push((source, dest));
        }

        plan.into_iter()
            .map(|(source, dest)| self.synthesize_file(source, &dest))
            .collect()
    }

    /// Replace each file with its placeholder in its own directory.
    pub fn synthesize_in_place(&self, corrupted: &[PathBuf]) -> Result<Vec<PathBuf>> {
        corrupted
            .iter()
            .map(|source| self.synthesize_file(source, source))
            .collect()
    }

    /// Write the placeholder for `source` to `dest` and re-validate it.
    pub fn synthesize_file(&self, source: &Path, dest: &Path) -> Result<PathBuf> {
        let document = placeholder_document(source, Utc::now());
        let text = render_placeholder(dest, &document)?;
        write_atomic(dest, text.as_bytes()).map_err(|e| GuardError::SynthesisFailure {
            path: dest.to_path_buf(),
            errors: vec![e.to_string()],
        })?;

        let check = self.validator.validate(dest);
        if !check.is_valid {
            return Err(GuardError::SynthesisFailure {
                path: dest.to_path_buf(),
                errors: check.errors,
            });
        }

        METRICS.inc_placeholders();
        obs::emit_emergency_synthesized(&dest.display().to_string());
        Ok(dest.to_path_buf())
    }
}
