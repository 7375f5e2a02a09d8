//! Run registry: collision-safe creation plus load/save of `run.json`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use chrono::{DateTime, SubsecRound, Utc};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::record::{RoleRoster, RunRecord};
use crate::core::run_id::{format_run_id, looks_like_run_id, parse_run_id};
use crate::core::scopes::ScopeAllocation;
use crate::core::types::Phase;
use crate::error::StudioError;
use crate::io::fs::write_json_atomic;
use crate::io::paths::{RECORD_FILE, StudioPaths};

const RUN_RECORD_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/run_record/v1.schema.json"
));

/// Suffix of a run directory that is being (or failed to be) deleted.
pub const TOMBSTONE_SUFFIX: &str = ".reclaiming";

/// Metadata supplied by `prepare` for a new run.
#[derive(Debug, Clone)]
pub struct NewRun {
    pub phase: Phase,
    pub input: String,
    pub iteration_budget: u32,
    pub scopes: Option<ScopeAllocation>,
    pub budget_cap: Option<String>,
    pub roles: Option<RoleRoster>,
}

/// A record together with the directory it was loaded from.
#[derive(Debug, Clone)]
pub struct StoredRun {
    pub record: RunRecord,
    pub dir: PathBuf,
}

/// A `run_*` directory whose record could not be resolved. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptRun {
    pub phase: Phase,
    pub name: String,
    pub dir: PathBuf,
    pub reason: String,
}

/// A half-deleted run directory left by an interrupted eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tombstone {
    pub phase: Phase,
    pub run_id: String,
    pub dir: PathBuf,
}

/// Everything found under `output/`.
#[derive(Debug, Clone, Default)]
pub struct RunInventory {
    pub runs: Vec<StoredRun>,
    pub corrupt: Vec<CorruptRun>,
    pub tombstones: Vec<Tombstone>,
}

impl RunInventory {
    pub fn records(&self) -> Vec<RunRecord> {
        self.runs.iter().map(|run| run.record.clone()).collect()
    }
}

/// Create the run directory and persist a `PENDING` record.
///
/// The run directory is created with a single `create_dir`; an
/// `AlreadyExists` failure is the collision signal. The registry never
/// retries on its own.
pub fn create_run(paths: &StudioPaths, new: NewRun, now: DateTime<Utc>) -> Result<RunRecord> {
    let created_at = now.trunc_subsecs(0);
    let run_id = format_run_id(new.phase, created_at);
    let phase_dir = paths.phase_dir(new.phase);
    fs::create_dir_all(&phase_dir).map_err(|err| StudioError::io(&phase_dir, err))?;

    let run_dir = paths.run_dir(new.phase, &run_id);
    match fs::create_dir(&run_dir) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            warn!(run_id = %run_id, "run id collision");
            return Err(StudioError::Collision {
                run_id,
                path: run_dir,
            }
            .into());
        }
        Err(err) => return Err(StudioError::io(&run_dir, err).into()),
    }

    let mut record = RunRecord::new(
        run_id,
        new.phase,
        new.input,
        created_at,
        new.iteration_budget,
    );
    record.scopes = new.scopes;
    record.budget_cap = new.budget_cap;
    record.roles = new.roles;

    if let Err(err) = save_run(paths, &record) {
        // Only our own empty directory is removed; nothing else was written.
        let _ = fs::remove_dir(&run_dir);
        return Err(err);
    }
    info!(run_id = %record.run_id, phase = %record.phase, "run created");
    Ok(record)
}

/// Load and schema-validate a record. Every failure is `NotFound`.
pub fn load_run(paths: &StudioPaths, run_id: &str) -> Result<RunRecord> {
    let (phase, _) = parse_run_id(run_id)?;
    let run_dir = paths.run_dir(phase, run_id);
    Ok(load_record_at(&run_dir, run_id)?)
}

/// Overwrite `run.json` atomically. The run directory must already exist.
pub fn save_run(paths: &StudioPaths, record: &RunRecord) -> Result<()> {
    let run_dir = paths.run_dir(record.phase, &record.run_id);
    if !run_dir.is_dir() {
        return Err(StudioError::not_found(&record.run_id, "run directory missing").into());
    }
    let path = run_dir.join(RECORD_FILE);
    debug!(run_id = %record.run_id, path = %path.display(), "save run record");
    write_json_atomic(&path, record)
}

/// Scan `output/<phase>/` for runs, unreadable runs and tombstones.
pub fn list_runs(paths: &StudioPaths) -> Result<RunInventory> {
    let mut inventory = RunInventory::default();
    for phase in Phase::ALL {
        let phase_dir = paths.phase_dir(phase);
        for (name, dir) in sorted_subdirs(&phase_dir)? {
            if let Some(run_id) = tombstone_run_id(&name) {
                inventory.tombstones.push(Tombstone {
                    phase,
                    run_id: run_id.to_string(),
                    dir,
                });
                continue;
            }
            if !name.starts_with("run_") {
                continue;
            }
            let loaded = if looks_like_run_id(&name) {
                load_record_at(&dir, &name).and_then(|record| {
                    if record.phase == phase {
                        Ok(record)
                    } else {
                        Err(StudioError::not_found(
                            &name,
                            format!("record phase {} stored under {phase}", record.phase),
                        ))
                    }
                })
            } else {
                Err(StudioError::not_found(&name, "malformed run id"))
            };
            match loaded {
                Ok(record) => inventory.runs.push(StoredRun { record, dir }),
                Err(err) => {
                    warn!(path = %dir.display(), error = %err, "unreadable run");
                    inventory.corrupt.push(CorruptRun {
                        phase,
                        name,
                        reason: err.to_string(),
                        dir,
                    });
                }
            }
        }
    }
    Ok(inventory)
}

/// `run_x` -> `.run_x.reclaiming`.
pub fn tombstone_name(run_id: &str) -> String {
    format!(".{run_id}{TOMBSTONE_SUFFIX}")
}

fn tombstone_run_id(name: &str) -> Option<&str> {
    name.strip_prefix('.')?.strip_suffix(TOMBSTONE_SUFFIX)
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(StudioError::io(dir, err).into()),
    };
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| StudioError::io(dir, err))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        dirs.push((entry.file_name().to_string_lossy().into_owned(), path));
    }
    dirs.sort();
    Ok(dirs)
}

fn load_record_at(run_dir: &Path, run_id: &str) -> Result<RunRecord, StudioError> {
    if !run_dir.is_dir() {
        return Err(StudioError::not_found(run_id, "run directory missing"));
    }
    let path = run_dir.join(RECORD_FILE);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(StudioError::not_found(run_id, format!("{RECORD_FILE} missing")));
        }
        Err(err) => {
            return Err(StudioError::not_found(
                run_id,
                format!("read {}: {err}", path.display()),
            ));
        }
    };
    let value: Value = serde_json::from_str(&contents).map_err(|err| {
        StudioError::not_found(run_id, format!("parse {}: {err}", path.display()))
    })?;
    validate_schema(&value).map_err(|err| StudioError::not_found(run_id, format!("{err:#}")))?;
    let record: RunRecord = serde_json::from_value(value).map_err(|err| {
        StudioError::not_found(run_id, format!("deserialize {}: {err}", path.display()))
    })?;
    if record.run_id != run_id {
        return Err(StudioError::not_found(
            run_id,
            format!("{RECORD_FILE} belongs to {}", record.run_id),
        ));
    }
    Ok(record)
}

fn validate_schema(record: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(RUN_RECORD_SCHEMA)
        .map_err(|err| anyhow!("parse run record schema: {err}"))?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {err}"))?;
    if !compiled.is_valid(record) {
        let messages = compiled
            .iter_errors(record)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "run record schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}
