//! Read-only artifact check for `studio validate`.

use anyhow::{Context, Result};

use crate::core::checklist::{ValidationResult, evaluate};
use crate::core::record::RunRecord;
use crate::core::types::{Phase, RoleStatus};
use crate::error::StudioError;
use crate::io::listing::read_listing;
use crate::io::paths::StudioPaths;
use crate::io::registry::load_run;

/// Validation outcome for one run.
#[derive(Debug, Clone)]
pub struct ValidateOutcome {
    pub record: RunRecord,
    pub result: ValidationResult,
}

/// Evaluate a run's artifacts against its checklist. Never writes.
pub fn validate_run(paths: &StudioPaths, phase: Phase, run_id: &str) -> Result<ValidateOutcome> {
    let record = load_run(paths, run_id).with_context(|| format!("validate {run_id}"))?;
    if record.phase != phase {
        return Err(StudioError::not_found(
            run_id,
            format!("run belongs to phase {}, not {phase}", record.phase),
        )
        .into());
    }
    let listing = read_listing(&paths.run_dir(phase, run_id))?;
    let result = evaluate(
        phase,
        record.invited_roles(),
        record.summary_file(),
        &listing,
    );
    Ok(ValidateOutcome { record, result })
}

/// Pass/fail per category, then the per-role breakdown for multi-role runs.
pub fn render_validation(outcome: &ValidateOutcome) -> String {
    let result = &outcome.result;
    let verdict = if result.passes() { "PASS" } else { "FAIL" };
    let mut lines = vec![format!(
        "Validation {} ({}): {verdict}",
        outcome.record.run_id, outcome.record.phase
    )];
    for (category, passed, unmet) in result.categories() {
        if passed {
            lines.push(format!("- {}: ok", category.as_str()));
            continue;
        }
        let names = unmet
            .iter()
            .map(|requirement| requirement.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("- {}: missing {names}", category.as_str()));
    }
    for (role, check) in &result.roles {
        let status = match check.status {
            RoleStatus::Completed => "COMPLETED",
            RoleStatus::Missing => "MISSING",
            RoleStatus::Invited => "INVITED",
        };
        lines.push(format!(
            "  - {role}: {status} (advocate {}, contrarian {}, latest {})",
            check.advocate_rounds,
            check.contrarian_rounds,
            if check.approved { "approved" } else { "not approved" }
        ));
    }
    lines.push(format!("- Observed iterations: {}", result.iterations_observed));
    lines.join("\n")
}
