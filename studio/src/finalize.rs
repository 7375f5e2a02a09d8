//! Orchestration for `studio finalize`.
//!
//! Validation runs for every finalize but only gates `COMPLETED`. A blocked
//! finalize is a value ([`FinalizeOutcome::Blocked`]), not an error, and
//! writes nothing.

use std::path::{Component, Path};

use anyhow::{Context, Result};
use chrono::{DateTime, SubsecRound, Utc};
use tracing::{info, warn};

use crate::core::checklist::{ValidationResult, evaluate};
use crate::core::record::RunRecord;
use crate::core::types::{Phase, RunStatus, Verdict};
use crate::error::StudioError;
use crate::io::index_store::{append_history, rebuild_index};
use crate::io::listing::read_listing;
use crate::io::paths::StudioPaths;
use crate::io::registry::{load_run, save_run};

#[derive(Debug, Clone)]
pub struct FinalizeOptions {
    pub run_id: String,
    pub status: RunStatus,
    pub verdict: Option<Verdict>,
    /// Defaults to the iteration count observed in the run directory.
    pub iterations_run: Option<u32>,
    pub hours: Option<f64>,
    pub cost: Option<f64>,
    /// Summary file relative to the run directory.
    pub summary: Option<String>,
}

impl FinalizeOptions {
    pub fn completed(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            status: RunStatus::Completed,
            verdict: None,
            iterations_run: None,
            hours: None,
            cost: None,
            summary: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum FinalizeOutcome {
    Finalized(RunRecord),
    /// `COMPLETED` was requested but blocking artifacts are missing.
    Blocked(ValidationResult),
}

/// Validate the run directory and move the record to a terminal status.
pub fn finalize_run(
    paths: &StudioPaths,
    phase: Phase,
    options: &FinalizeOptions,
    now: DateTime<Utc>,
) -> Result<FinalizeOutcome> {
    check_options(options)?;

    let mut record = load_run(paths, &options.run_id)
        .with_context(|| format!("finalize {}", options.run_id))?;
    if record.phase != phase {
        return Err(StudioError::not_found(
            &options.run_id,
            format!("run belongs to phase {}, not {phase}", record.phase),
        )
        .into());
    }

    let run_dir = paths.run_dir(phase, &record.run_id);
    let summary_file = options
        .summary
        .clone()
        .unwrap_or_else(|| record.summary_file().to_string());
    let listing = read_listing(&run_dir)?;
    let result = evaluate(phase, record.invited_roles(), &summary_file, &listing);

    if options.status == RunStatus::Completed && !result.passes() {
        warn!(
            run_id = %record.run_id,
            missing = result.blocking().len(),
            "finalize blocked by missing artifacts"
        );
        return Ok(FinalizeOutcome::Blocked(result));
    }

    record.status = options.status;
    if let Some(verdict) = options.verdict {
        record.verdict = Some(verdict);
    }
    record.iterations_run = Some(options.iterations_run.unwrap_or(result.iterations_observed));
    if options.hours.is_some() {
        record.hours = options.hours;
    }
    if options.cost.is_some() {
        record.cost = options.cost;
    }
    if listing.contains(&summary_file) {
        record.summary_path = Some(summary_file);
    }
    if phase.is_multi_role() {
        record.role_status = Some(result.role_status());
    }
    record.updated_at = now.trunc_subsecs(0).max(record.created_at);

    save_run(paths, &record)?;
    rebuild_index(paths).context("rebuild index")?;
    append_history(paths, &record).context("append run history")?;
    info!(run_id = %record.run_id, status = %record.status, "run finalized");
    Ok(FinalizeOutcome::Finalized(record))
}

fn check_options(options: &FinalizeOptions) -> Result<(), StudioError> {
    if !options.status.is_terminal() {
        return Err(StudioError::config(
            "status",
            "must be COMPLETED, ABANDONED or FAILED",
        ));
    }
    for (field, value) in [("hours", options.hours), ("cost", options.cost)] {
        if value.is_some_and(|value| !value.is_finite() || value < 0.0) {
            return Err(StudioError::config(field, "must be a non-negative number"));
        }
    }
    if let Some(summary) = &options.summary {
        let path = Path::new(summary);
        let escapes = path
            .components()
            .any(|part| !matches!(part, Component::Normal(_) | Component::CurDir));
        if summary.trim().is_empty() || escapes {
            return Err(StudioError::config(
                "summary",
                "must be a relative path inside the run directory",
            ));
        }
    }
    Ok(())
}

/// Operator-facing list of the artifacts blocking `COMPLETED`.
pub fn render_blocked(run_id: &str, result: &ValidationResult) -> String {
    let mut lines = vec![format!(
        "Cannot mark {run_id} COMPLETED; missing required artifacts:"
    )];
    for requirement in result.blocking() {
        lines.push(format!("- {requirement}"));
    }
    lines.join("\n")
}
