//! Orchestration for `studio prepare`.
//!
//! Every configuration input (settings, scopes, roster) is resolved before
//! anything is written, so a `Config` failure never leaves a half-created run.
//! The optional cleanup pass runs next, then the registry creates the run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::cleanup::run_cleanup;
use crate::core::record::{RoleRoster, RunRecord};
use crate::core::scopes::{AllocationOptions, ScopeAllocation, allocate};
use crate::core::types::Phase;
use crate::error::StudioError;
use crate::io::config::{StudioConfig, load_config};
use crate::io::index_store::rebuild_index;
use crate::io::instructions::write_instructions;
use crate::io::paths::StudioPaths;
use crate::io::reclaim::ReclaimReport;
use crate::io::registry::{NewRun, create_run};
use crate::io::roles::{RoleDetails, resolve_roster};
use crate::io::scope_config::{ScopeSource, load_scope_config};

#[derive(Debug, Clone, Default)]
pub struct PrepareOptions {
    pub text: String,
    /// Overrides `[prepare] max_iterations`.
    pub max_iterations: Option<u32>,
    /// Explicit scope file; otherwise `.studio/scopes.toml` if present.
    pub scope_config: Option<PathBuf>,
    pub allow_under_allocation: bool,
    pub role_pack: Option<String>,
    /// `+role` / `-role` tokens.
    pub role_overrides: Vec<String>,
    /// Overrides `[prepare] budget_cap`.
    pub budget: Option<String>,
    pub skip_cleanup: bool,
    pub cleanup_dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct PrepareOutcome {
    pub record: RunRecord,
    pub run_dir: PathBuf,
    pub instructions_path: PathBuf,
    /// `None` when cleanup was skipped.
    pub cleanup: Option<ReclaimReport>,
}

/// Create a new run for `phase`.
pub fn prepare_run(
    paths: &StudioPaths,
    phase: Phase,
    options: &PrepareOptions,
    now: DateTime<Utc>,
) -> Result<PrepareOutcome> {
    let input = options.text.trim();
    if input.is_empty() {
        return Err(StudioError::config("text", "input text cannot be empty").into());
    }
    let config = load_config(&paths.settings_path).context("load studio settings")?;
    let iteration_budget = options
        .max_iterations
        .unwrap_or(config.prepare.max_iterations);
    if iteration_budget == 0 {
        return Err(StudioError::config("max_iterations", "must be > 0").into());
    }

    let scopes = resolve_scopes(paths, options, iteration_budget)?;
    let (roles, role_details, budget_cap) = resolve_roles(paths, phase, options, &config)?;

    let cleanup = if options.skip_cleanup {
        debug!("cleanup skipped");
        None
    } else {
        match run_cleanup(paths, &config, now, options.cleanup_dry_run) {
            Ok(report) => Some(report),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "cleanup failed; continuing with prepare");
                None
            }
        }
    };

    let record = create_run(
        paths,
        NewRun {
            phase,
            input: input.to_string(),
            iteration_budget,
            scopes,
            budget_cap,
            roles,
        },
        now,
    )?;
    let run_dir = paths.run_dir(phase, &record.run_id);
    let instructions_path = write_instructions(paths, &record, &role_details)
        .with_context(|| format!("write instructions for {}", record.run_id))?;
    rebuild_index(paths).context("rebuild index")?;
    info!(run_id = %record.run_id, "prepared run");

    Ok(PrepareOutcome {
        record,
        run_dir,
        instructions_path,
        cleanup,
    })
}

fn resolve_scopes(
    paths: &StudioPaths,
    options: &PrepareOptions,
    iteration_budget: u32,
) -> Result<Option<ScopeAllocation>> {
    let source = match &options.scope_config {
        Some(path) => ScopeSource::Explicit(path),
        None => ScopeSource::Default(&paths.scopes_path),
    };
    let Some(config) = load_scope_config(source)? else {
        return Ok(None);
    };
    let allocation = allocate(
        &config,
        iteration_budget,
        AllocationOptions {
            allow_under_allocation: options.allow_under_allocation,
        },
    )?;
    debug!(scopes = allocation.0.len(), total = allocation.total(), "allocated scopes");
    Ok(Some(allocation))
}

type ResolvedRoles = (Option<RoleRoster>, Vec<RoleDetails>, Option<String>);

fn resolve_roles(
    paths: &StudioPaths,
    phase: Phase,
    options: &PrepareOptions,
    config: &StudioConfig,
) -> Result<ResolvedRoles> {
    if !phase.is_multi_role() {
        if options.role_pack.is_some() || !options.role_overrides.is_empty() {
            warn!(phase = %phase, "role options only apply to the studio phase; ignoring");
        }
        return Ok((None, Vec::new(), None));
    }
    let (roster, details) =
        resolve_roster(paths, options.role_pack.as_deref(), &options.role_overrides)?;
    let budget_cap = options
        .budget
        .clone()
        .unwrap_or_else(|| config.prepare.budget_cap.clone());
    Ok((Some(roster), details, Some(budget_cap)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RunStatus;
    use crate::io::registry::load_run;
    use crate::test_support::{TestStudio, fixed_time};
    use std::fs;

    fn options(text: &str) -> PrepareOptions {
        PrepareOptions {
            text: text.to_string(),
            skip_cleanup: true,
            ..PrepareOptions::default()
        }
    }

    #[test]
    fn prepares_single_role_run_with_defaults() {
        let studio = TestStudio::new();
        let now = fixed_time(2025, 3, 1, 12, 0, 0);
        let outcome =
            prepare_run(&studio.paths, Phase::Market, &options(" idle farming "), now).expect("prepare");

        assert_eq!(outcome.record.run_id, "run_market_20250301_120000");
        assert_eq!(outcome.record.input, "idle farming");
        assert_eq!(outcome.record.iteration_budget, 3);
        assert_eq!(outcome.record.status, RunStatus::Pending);
        assert!(outcome.record.budget_cap.is_none());
        assert!(outcome.instructions_path.is_file());
        assert_eq!(load_run(&studio.paths, &outcome.record.run_id).expect("load"), outcome.record);

        let index = fs::read_to_string(&studio.paths.index_path).expect("index");
        assert!(index.contains("| run_market_20250301_120000 | market |"));
    }

    #[test]
    fn empty_text_fails_before_writing() {
        let studio = TestStudio::new();
        let err = prepare_run(
            &studio.paths,
            Phase::Tech,
            &options("   "),
            fixed_time(2025, 3, 1, 12, 0, 0),
        )
        .unwrap_err();
        assert!(err.to_string().contains("`text`"));
        assert!(!studio.paths.output_dir.exists());
    }

    #[test]
    fn scope_budget_too_small_is_config_error_without_run() {
        let studio = TestStudio::new();
        studio.write_scopes(&[("high", "Vision", 3), ("mid", "Systems", 2), ("low", "Polish", 1)]);
        let mut opts = options("deckbuilder");
        opts.max_iterations = Some(2);
        let err = prepare_run(&studio.paths, Phase::Design, &opts, fixed_time(2025, 3, 1, 12, 0, 0))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StudioError>(),
            Some(StudioError::Config { field, .. }) if field == "max_iterations"
        ));
        assert!(!studio.paths.phase_dir(Phase::Design).exists());

        opts.allow_under_allocation = true;
        let outcome =
            prepare_run(&studio.paths, Phase::Design, &opts, fixed_time(2025, 3, 1, 12, 0, 0))
                .expect("prepare");
        assert_eq!(outcome.record.scopes.expect("scopes").total(), 2);
    }

    #[test]
    fn default_scope_file_is_allocated() {
        let studio = TestStudio::new();
        studio.write_scopes(&[("high", "Vision", 3), ("mid", "Systems", 2), ("low", "Polish", 1)]);
        let mut opts = options("deckbuilder");
        opts.max_iterations = Some(12);
        let outcome =
            prepare_run(&studio.paths, Phase::Tech, &opts, fixed_time(2025, 3, 1, 12, 0, 0))
                .expect("prepare");
        let scopes = outcome.record.scopes.expect("scopes");
        assert_eq!(scopes.get("high"), Some(6));
        assert_eq!(scopes.get("mid"), Some(4));
        assert_eq!(scopes.get("low"), Some(2));
    }

    #[test]
    fn studio_phase_freezes_roster_and_budget() {
        let studio = TestStudio::new();
        studio.seed_role_manifest(&["marketing", "design"], &["marketing"]);
        let mut opts = options("co-op survival");
        opts.role_overrides = vec!["+design".to_string()];
        let outcome =
            prepare_run(&studio.paths, Phase::Studio, &opts, fixed_time(2025, 3, 1, 12, 0, 0))
                .expect("prepare");
        let roster = outcome.record.roles.expect("roles");
        assert_eq!(roster.invited.len(), 2);
        assert_eq!(outcome.record.budget_cap.as_deref(), Some("$0-20/mo"));
        let doc = fs::read_to_string(&outcome.instructions_path).expect("instructions");
        assert!(doc.contains("## Role Menu"));
    }

    #[test]
    fn studio_phase_without_manifest_fails_cleanly() {
        let studio = TestStudio::new();
        let err = prepare_run(
            &studio.paths,
            Phase::Studio,
            &options("co-op survival"),
            fixed_time(2025, 3, 1, 12, 0, 0),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StudioError>(),
            Some(StudioError::Config { .. })
        ));
        assert!(!studio.paths.output_dir.exists());
    }

    #[test]
    fn cleanup_runs_before_creation_unless_skipped() {
        let studio = TestStudio::new();
        let old = studio.create_run_at(Phase::Market, fixed_time(2024, 1, 1, 0, 0, 0));
        let mut opts = options("roguelite");
        opts.skip_cleanup = false;
        let outcome =
            prepare_run(&studio.paths, Phase::Market, &opts, fixed_time(2025, 3, 1, 12, 0, 0))
                .expect("prepare");
        let report = outcome.cleanup.expect("report");
        assert_eq!(report.evictions.len(), 1);
        assert!(!studio.paths.run_dir(Phase::Market, &old.run_id).exists());
    }
}
