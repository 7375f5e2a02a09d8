//! Read a run directory into a [`RunListing`] for checklist evaluation.

use std::fs;
use std::path::Path;

use anyhow::Result;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::core::checklist::{ListedFile, RunListing, Side, parse_round};
use crate::core::types::Verdict;
use crate::core::verdict::extract_verdict;
use crate::error::StudioError;

/// List every file below `run_dir` (relative, `/`-separated, sorted).
///
/// Contrarian rounds at the top level are read for their verdict marker.
/// Nothing is written. Fails only if `run_dir` itself cannot be read.
pub fn read_listing(run_dir: &Path) -> Result<RunListing> {
    fs::read_dir(run_dir).map_err(|err| StudioError::io(run_dir, err))?;

    let mut files = Vec::new();
    for entry in WalkDir::new(run_dir).min_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(run_dir = %run_dir.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(run_dir) else {
            continue;
        };
        let path = relative
            .components()
            .map(|part| part.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let verdict = match parse_round(&path) {
            Some(round) if round.side == Side::Contrarian => read_verdict(entry.path()),
            _ => None,
        };
        files.push(ListedFile { path, verdict });
    }
    debug!(run_dir = %run_dir.display(), files = files.len(), "listed run directory");
    Ok(RunListing { files })
}

fn read_verdict(path: &Path) -> Option<Verdict> {
    match fs::read_to_string(path) {
        Ok(text) => extract_verdict(&text),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cannot read contrarian round");
            None
        }
    }
}
