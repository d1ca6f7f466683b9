//! File type inference for workflow artifacts.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Grammar family of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Yaml,
    Json,
    Markdown,
    Unknown,
}

impl FileType {
    /// Map a file extension (without the dot, any case) to a type.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "yml" | "yaml" => Self::Yaml,
            "json" => Self::Json,
            "md" | "markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Infer a type from content alone: a leading `{` or `[` is JSON-like,
    /// any other non-blank text is YAML-like.
    pub fn sniff(content: &[u8]) -> Self {
        match content.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') | Some(b'[') => Self::Json,
            Some(_) => Self::Yaml,
            None => Self::Unknown,
        }
    }

    /// Classify by extension first, falling back to content sniffing.
    pub fn classify(path: &Path, content: Option<&[u8]>) -> Self {
        let by_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown);
        match (by_ext, content) {
            (Self::Unknown, Some(bytes)) => Self::sniff(bytes),
            (t, _) => t,
        }
    }

    /// Prefix used for parse diagnostics of this grammar.
    pub fn parse_error_prefix(self) -> &'static str {
        match self {
            Self::Yaml => "YAML parsing error",
            Self::Json => "JSON parsing error",
            Self::Markdown => "Markdown validation error",
            Self::Unknown => "Unknown file type",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
