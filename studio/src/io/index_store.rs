//! `output/index.md` and `knowledge/run_log.md` on disk.

use anyhow::Result;
use tracing::debug;

use crate::core::index::{HISTORY_HEADER, render_history_entry, render_index};
use crate::core::record::RunRecord;
use crate::io::fs::{append_atomic, write_atomic};
use crate::io::paths::StudioPaths;
use crate::io::registry::list_runs;

/// Rebuild the index from every resolvable record. Corrupt runs are skipped.
pub fn rebuild_index(paths: &StudioPaths) -> Result<Vec<RunRecord>> {
    let records = list_runs(paths)?.records();
    write_index(paths, &records)?;
    Ok(records)
}

pub fn write_index(paths: &StudioPaths, records: &[RunRecord]) -> Result<()> {
    debug!(path = %paths.index_path.display(), runs = records.len(), "rebuild index");
    write_atomic(&paths.index_path, &render_index(records))
}

/// Append one history entry; prior entries are never rewritten.
pub fn append_history(paths: &StudioPaths, record: &RunRecord) -> Result<()> {
    debug!(path = %paths.history_path.display(), run_id = %record.run_id, "append history");
    append_atomic(
        &paths.history_path,
        HISTORY_HEADER,
        &render_history_entry(record),
    )
}
