//! `instructions.md` rendering for a freshly prepared run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;
use tracing::debug;

use crate::core::checklist::{Side, role_round_file};
use crate::core::record::RunRecord;
use crate::core::scopes::render_scope_plan;
use crate::io::fs::write_atomic;
use crate::io::paths::{INSTRUCTIONS_FILE, StudioPaths, display_relative};
use crate::io::roles::RoleDetails;

const INSTRUCTIONS_TEMPLATE: &str = include_str!("templates/instructions.md");
const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Serialize)]
struct RoleRow {
    title: String,
    slug: String,
    advocate_focus: String,
    contrarian_focus: String,
    deliverables: Vec<String>,
    escalate_on: Vec<String>,
    prompt_doc: String,
    advocate_file: String,
    contrarian_file: String,
}

impl RoleRow {
    fn from_details(details: &RoleDetails) -> Self {
        Self {
            title: details.title.clone(),
            slug: details.id.slug(),
            advocate_focus: details.advocate_focus.clone(),
            contrarian_focus: details.contrarian_focus.clone(),
            deliverables: details.deliverables.clone(),
            escalate_on: details.escalate_on.clone(),
            prompt_doc: details.prompt_doc.clone(),
            advocate_file: role_round_file(Side::Advocate, &details.id, 1),
            contrarian_file: role_round_file(Side::Contrarian, &details.id, 1),
        }
    }
}

#[derive(Debug, Serialize)]
struct DetailsContext {
    advocate: &'static str,
    contrarian: &'static str,
    deliverable_owner: &'static str,
    deliverables: &'static [&'static str],
    notes: &'static str,
}

/// Render the instructions document for `record`.
pub fn render_instructions(
    paths: &StudioPaths,
    record: &RunRecord,
    roles: &[RoleDetails],
) -> Result<String> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template("instructions", INSTRUCTIONS_TEMPLATE)
        .context("load instructions template")?;
    let template = env.get_template("instructions")?;

    let details = record.phase.details();
    let rows: Vec<RoleRow> = roles.iter().map(RoleRow::from_details).collect();
    let escalations: Vec<&RoleRow> = rows.iter().filter(|row| !row.escalate_on.is_empty()).collect();
    let run_dir = paths.run_dir(record.phase, &record.run_id);
    let rendered = template.render(context! {
        run_id => &record.run_id,
        phase_title => phase_title(record.phase.as_str()),
        run_dir => display_relative(&run_dir, &paths.root),
        max_iterations => record.iteration_budget,
        input => record.input.trim(),
        created => record.created_at.format(CREATED_FORMAT).to_string(),
        budget_cap => record.budget_cap.as_deref(),
        roster => record.roles.as_ref(),
        multi_role => record.phase.is_multi_role(),
        details => DetailsContext {
            advocate: details.advocate,
            contrarian: details.contrarian,
            deliverable_owner: details.deliverable_owner,
            deliverables: details.deliverables,
            notes: details.notes,
        },
        scope_plan => record.scopes.as_ref().map(render_scope_plan),
        roles => rows,
        escalations => escalations,
        finalize_command => finalize_command(record),
    })?;
    Ok(rendered)
}

/// Render and atomically write `instructions.md` into the run directory.
pub fn write_instructions(
    paths: &StudioPaths,
    record: &RunRecord,
    roles: &[RoleDetails],
) -> Result<PathBuf> {
    let rendered = render_instructions(paths, record, roles)?;
    let path = paths
        .run_dir(record.phase, &record.run_id)
        .join(INSTRUCTIONS_FILE);
    debug!(path = %path.display(), bytes = rendered.len(), "write instructions");
    write_atomic(&path, &rendered)?;
    Ok(path)
}

/// The exact command that closes the run.
pub fn finalize_command(record: &RunRecord) -> String {
    format!(
        "studio finalize --phase {} --run-id {} --status completed --verdict <APPROVED|REJECTED|N/A>",
        record.phase, record.run_id
    )
}

fn phase_title(phase: &str) -> String {
    let mut chars = phase.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
