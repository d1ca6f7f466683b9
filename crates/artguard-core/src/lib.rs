//! Artifact Guard Core Library
//!
//! Detects structural corruption in the YAML/JSON/Markdown artifacts of a
//! security workflow, repairs what it safely can, decides how much of the
//! workflow may still run and raises a multi-channel alert.

pub mod alert;
pub mod atomic;
pub mod config;
pub mod degradation;
pub mod discovery;
pub mod domain;
pub mod emergency;
pub mod guard;
pub mod metrics;
pub mod obs;
pub mod repair;
pub mod reporting;
pub mod telemetry;
pub mod validator;

pub use alert::{
    build_alert, build_channels, deliver, AlertChannel, AlertSeverity, ChannelKind,
    ChannelOutcome, CorruptionAlert, DegradationContext, DeliveryReport,
};

pub use config::{parse_name_list, GuardConfig};

pub use degradation::{
    classify, execute_degraded, plan, DegradationPolicy, DegradedExecution, FallbackData,
    FallbackStrategy, FunctionalityLevel, Operation,
};

pub use discovery::discover_artifacts;

pub use domain::{
    shape_for, ArtifactShape, FileType, GuardError, ParseLocation, Result, ValidationResult,
    ValidationSummary, DEFAULT_CRITICAL_FILES,
};

pub use emergency::EmergencySynthesizer;

pub use guard::{exit_code, ArtifactGuard, GuardReport};

pub use repair::{RepairPass, RepairRecord, Repairer};

pub use reporting::{render_summary_markdown, render_summary_text, write_summary_json};

pub use validator::StructuralValidator;

/// Artifact Guard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
