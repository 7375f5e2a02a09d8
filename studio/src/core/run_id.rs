//! Run identifier formatting and parsing.
//!
//! Identifiers are `run_<phase>_<YYYYMMDD_HHMMSS>` in UTC. Second resolution
//! means two requests for the same phase in the same second compute the same
//! id; the registry turns that into a collision.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::core::types::Phase;
use crate::error::StudioError;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const PREFIX: &str = "run_";

/// Compute the run id for `phase` at `at`.
pub fn format_run_id(phase: Phase, at: DateTime<Utc>) -> String {
    format!("{PREFIX}{}_{}", phase.as_str(), at.format(TIMESTAMP_FORMAT))
}

/// Decompose a run id into phase and creation timestamp.
pub fn parse_run_id(run_id: &str) -> Result<(Phase, DateTime<Utc>), StudioError> {
    let invalid = || {
        StudioError::not_found(
            run_id,
            "malformed run id (expected run_<phase>_<YYYYMMDD_HHMMSS>)",
        )
    };
    let rest = run_id.strip_prefix(PREFIX).ok_or_else(invalid)?;
    let (phase_raw, stamp) = rest.split_once('_').ok_or_else(invalid)?;
    let phase: Phase = phase_raw.parse().map_err(|_| invalid())?;
    let naive = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).map_err(|_| invalid())?;
    Ok((phase, naive.and_utc()))
}

/// Cheap shape check used when scanning directories.
pub fn looks_like_run_id(name: &str) -> bool {
    parse_run_id(name).is_ok()
}
