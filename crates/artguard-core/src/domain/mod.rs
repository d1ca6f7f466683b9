//! Domain models for artifact guarding.
//!
//! - `FileType`: grammar family inferred from extension or content
//! - `ValidationResult` / `ValidationSummary`: per-pass validation records
//! - `ArtifactShape`: required top-level keys of known artifacts
//! - `GuardError`: hard failures that cross a function boundary

pub mod error;
pub mod file_type;
pub mod shape;
pub mod validation;

pub use error::{GuardError, Result};
pub use file_type::FileType;
pub use shape::{shape_for, ArtifactShape, EmptyValue, DEFAULT_CRITICAL_FILES, KNOWN_SHAPES};
pub use validation::{ParseLocation, ValidationResult, ValidationSummary};
