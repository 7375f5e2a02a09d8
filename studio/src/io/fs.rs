//! File-system primitives shared by every mutating operation.
//!
//! All writes go through a temp file in the destination directory followed by
//! a rename, so concurrent readers see either the old or the new contents.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Atomically replace `path` with `contents` (temp file + rename).
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = temp_path(path);
    debug!(path = %path.display(), tmp = %tmp_path.display(), "atomic write");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err).with_context(|| format!("replace {}", path.display()));
    }
    Ok(())
}

/// Serialize `value` as pretty JSON with a trailing newline and write atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value).context("serialize json")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

/// Append `entry` to `path`, seeding it with `header` when absent.
///
/// Prior bytes are carried over verbatim; the whole file is then replaced
/// atomically so a crash never leaves a half-written entry.
pub fn append_atomic(path: &Path, header: &str, entry: &str) -> Result<()> {
    let mut contents = match fs::read_to_string(path) {
        Ok(existing) => existing,
        Err(err) if err.kind() == ErrorKind::NotFound => header.to_string(),
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    contents.push_str(entry);
    write_atomic(path, &contents)
}

/// Total bytes of regular files below `path`. Entries that vanish or cannot be
/// read mid-walk are skipped.
pub fn dir_size(path: &Path) -> u64 {
    let mut total = 0u64;
    for entry in WalkDir::new(path) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata() {
            Ok(meta) => total += meta.len(),
            Err(err) => warn!(path = %entry.path().display(), error = %err, "skipping entry"),
        }
    }
    total
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", process::id()))
}
