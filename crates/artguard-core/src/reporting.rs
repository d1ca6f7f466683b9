//! Human-readable and machine-readable validation reports.
//!
//! - `render_summary_text`: console listing, one line per file
//! - `render_summary_markdown`: table for CI step summaries
//! - `write_summary_json`: the serialized `ValidationSummary` artifact

use std::path::Path;

use crate::atomic::write_atomic;
use crate::domain::{Result, ValidationSummary};

/// Console report: a headline, then one line per file with its diagnostics
/// indented below.
pub fn render_summary_text(summary: &ValidationSummary) -> String {
    let mut out = format!(
        "Validated {} artifact(s): {} valid, {} invalid, {} error(s)\n",
        summary.total_files, summary.valid_files, summary.invalid_files, summary.total_errors
    );
    for result in &summary.results {
        let status = if result.is_valid { "OK  " } else { "FAIL" };
        out.push_str(&format!(
            "  {status} {} [{}]",
            result.file_path.display(),
            result.file_type
        ));
        if result.repair_attempted {
            out.push_str(" (repair attempted)");
        }
        out.push('\n');
        for error in &result.errors {
            out.push_str(&format!("         error: {error}\n"));
        }
        for warning in &result.warnings {
            out.push_str(&format!("         warning: {warning}\n"));
        }
    }
    out
}

/// Markdown report with one table row per file.
pub fn render_summary_markdown(summary: &ValidationSummary) -> String {
    let mut md = String::from("## Artifact validation\n\n");
    md.push_str(&format!(
        "**{}** file(s) checked: **{}** valid, **{}** invalid.\n\n",
        summary.total_files, summary.valid_files, summary.invalid_files
    ));
    if summary.results.is_empty() {
        md.push_str("No artifacts found.\n");
        return md;
    }

    md.push_str("| File | Type | Status | Details |\n|---|---|---|---|\n");
    for result in &summary.results {
        let status = if result.is_valid { "valid" } else { "**invalid**" };
        let details: Vec<String> = result
            .errors
            .iter()
            .chain(result.warnings.iter())
            .map(|d| d.replace('|', "\\|").replace('\n', " "))
            .collect();
        md.push_str(&format!(
            "| `{}` | {} | {} | {} |\n",
            result.file_path.display(),
            result.file_type,
            status,
            if details.is_empty() {
                "-".to_string()
            } else {
                details.join("<br>")
            }
        ));
    }
    md
}

/// Write `summary` as pretty JSON to `path`, replacing it atomically.
pub fn write_summary_json(summary: &ValidationSummary, path: &Path) -> Result<()> {
    let mut body = serde_json::to_vec_pretty(summary)?;
    body.push(b'\n');
    write_atomic(path, &body)
}
