//! Artifact discovery under an artifacts tree.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{FileType, GuardError, Result};

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &[".git", "target", ".artguard"];

/// Recursively collect YAML, JSON and Markdown files under `root`, sorted.
pub fn discover_artifacts(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(GuardError::FileNotFound {
            path: root.to_path_buf(),
        });
    }

    fn recurse(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        let name = dir.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if SKIPPED_DIRS.contains(&name) {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                recurse(&path, out)?;
            } else if path.is_file() && is_artifact(&path) {
                out.push(path);
            }
        }
        Ok(())
    }

    let mut out = Vec::new();
    if root.is_file() {
        if is_artifact(root) {
            out.push(root.to_path_buf());
        }
    } else {
        recurse(root, &mut out)?;
    }
    out.sort();
    Ok(out)
}

fn is_artifact(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FileType::from_extension(e) != FileType::Unknown)
        .unwrap_or(false)
}
