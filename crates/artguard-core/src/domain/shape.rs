//! Expected top-level shapes of known workflow artifacts.
//!
//! The validator checks these keys after a successful parse and the emergency
//! synthesizer writes an empty instance of the same shape, so the two can
//! never disagree about what a minimal valid artifact looks like.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::FileType;

/// Empty value written for a required key in a placeholder document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyValue {
    Mapping,
    Sequence,
}

impl EmptyValue {
    pub fn to_json(self) -> serde_json::Value {
        match self {
            Self::Mapping => serde_json::Value::Object(serde_json::Map::new()),
            Self::Sequence => serde_json::Value::Array(Vec::new()),
        }
    }
}

/// Required top-level keys for one artifact file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactShape {
    pub file_name: &'static str,
    pub file_type: FileType,
    pub required_keys: &'static [(&'static str, EmptyValue)],
}

impl ArtifactShape {
    pub fn key_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.required_keys.iter().map(|(k, _)| *k)
    }
}

/// Shapes of the artifacts the security workflow depends on.
pub const KNOWN_SHAPES: &[ArtifactShape] = &[
    ArtifactShape {
        file_name: "remediation-timeline.yml",
        file_type: FileType::Yaml,
        required_keys: &[("metadata", EmptyValue::Mapping), ("timeline", EmptyValue::Sequence)],
    },
    ArtifactShape {
        file_name: "findings-registry.json",
        file_type: FileType::Json,
        required_keys: &[("metadata", EmptyValue::Mapping), ("findings", EmptyValue::Sequence)],
    },
    ArtifactShape {
        file_name: "scan-config.yml",
        file_type: FileType::Yaml,
        required_keys: &[("scanners", EmptyValue::Sequence), ("targets", EmptyValue::Sequence)],
    },
];

/// File names whose corruption forces emergency mode unless the caller
/// supplies its own list.
pub const DEFAULT_CRITICAL_FILES: &[&str] = &[
    "remediation-timeline.yml",
    "findings-registry.json",
    "scan-config.yml",
];

/// Look up the shape for `path`.
///
/// Matches the exact file name, or the same stem with an extension of the
/// same grammar (`scan-config.yaml` resolves to `scan-config.yml`).
pub fn shape_for(path: &Path) -> Option<&'static ArtifactShape> {
    let name = path.file_name()?.to_str()?;
    if let Some(shape) = KNOWN_SHAPES.iter().find(|s| s.file_name == name) {
        return Some(shape);
    }
    let stem = path.file_stem()?.to_str()?;
    let ext_type = FileType::from_extension(path.extension()?.to_str()?);
    KNOWN_SHAPES.iter().find(|s| {
        let known_stem = Path::new(s.file_name).file_stem().and_then(|x| x.to_str());
        s.file_type == ext_type && known_stem == Some(stem)
    })
}
