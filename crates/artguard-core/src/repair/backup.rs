//! Pre-repair backups and content checksums.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::domain::{GuardError, Result};

/// SHA-256 of `data` as lowercase hex.
pub fn content_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Write a durable, byte-identical copy of `data` into `backup_dir`.
///
/// The name is `<file_name>.<UTC timestamp>.bak`; a counter is inserted on
/// collision so an existing backup is never overwritten. Returns only after
/// the copy has been fsynced.
pub fn write_backup(backup_dir: &Path, source: &Path, data: &[u8]) -> Result<PathBuf> {
    let fail = |source: std::io::Error| GuardError::BackupFailed {
        path: backup_dir.to_path_buf(),
        source,
    };

    fs::create_dir_all(backup_dir).map_err(fail)?;

    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6fZ");

    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{file_name}.{stamp}.bak")
        } else {
            format!("{file_name}.{stamp}.{attempt}.bak")
        };
        let path = backup_dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(data).map_err(fail)?;
                file.sync_all().map_err(fail)?;
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(fail(e)),
        }
    }
}
