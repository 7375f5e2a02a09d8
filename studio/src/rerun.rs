//! Rerun guidance for `studio rerun`: the latest rejected contrarian round and
//! the reasons it gives. Read-only.

use std::fs;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::checklist::Side;
use crate::core::rejection::{extract_reasons, is_rejection, render_rerun_guidance};
use crate::core::types::{Phase, RoleId};
use crate::error::StudioError;
use crate::io::listing::read_listing;
use crate::io::paths::StudioPaths;
use crate::io::registry::load_run;

pub const NO_REJECTION_MESSAGE: &str = "No previous rejections found. Starting fresh iteration.";

/// The latest rejected contrarian round of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RerunContext {
    pub iteration: u32,
    /// Role slug for multi-role rounds.
    pub role: Option<String>,
    /// Path relative to the run directory.
    pub file: String,
    pub reasons: Vec<String>,
}

impl RerunContext {
    pub fn render(&self) -> String {
        render_rerun_guidance(self.iteration, self.role.as_deref(), &self.reasons)
    }
}

/// Find the highest-numbered contrarian round that carries a rejection marker.
///
/// Single-role phases look at `contrarian_<n>.md`. The multi-role phase looks
/// at `role`'s rounds, or every role's when `role` is `None`.
pub fn find_rerun_context(
    paths: &StudioPaths,
    phase: Phase,
    run_id: &str,
    role: Option<&str>,
) -> Result<Option<RerunContext>> {
    let record = load_run(paths, run_id).with_context(|| format!("rerun {run_id}"))?;
    if record.phase != phase {
        return Err(StudioError::not_found(
            run_id,
            format!("run belongs to phase {}, not {phase}", record.phase),
        )
        .into());
    }
    let wanted = role.map(|role| RoleId::new(role).slug());
    let run_dir = paths.run_dir(phase, run_id);
    let listing = read_listing(&run_dir)?;

    let mut candidates: Vec<_> = listing
        .rounds()
        .filter(|(round, _)| round.side == Side::Contrarian)
        .filter(|(round, _)| {
            if !phase.is_multi_role() {
                return round.role.is_none();
            }
            match (&wanted, &round.role) {
                (Some(wanted), Some(slug)) => wanted == slug,
                (None, Some(_)) => true,
                (_, None) => false,
            }
        })
        .collect();
    candidates.sort_by(|(a, fa), (b, fb)| {
        b.iteration
            .cmp(&a.iteration)
            .then_with(|| fb.path.cmp(&fa.path))
    });

    for (round, file) in candidates {
        let path = run_dir.join(&file.path);
        let text = fs::read_to_string(&path).map_err(|err| StudioError::io(&path, err))?;
        if is_rejection(&text) {
            debug!(file = %file.path, "latest rejection");
            return Ok(Some(RerunContext {
                iteration: round.iteration,
                role: round.role,
                file: file.path.clone(),
                reasons: extract_reasons(&text),
            }));
        }
    }
    Ok(None)
}
