//! Test-only helpers: a throwaway studio root plus artifact and config writers.

use std::fs;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use tempfile::TempDir;

use crate::core::record::RunRecord;
use crate::core::types::Phase;
use crate::io::paths::StudioPaths;
use crate::io::registry::{NewRun, create_run};

/// Pack name written by [`TestStudio::seed_role_manifest`].
pub const TEST_ROLE_PACK: &str = "studio_core";

/// A studio root inside a temporary directory, removed on drop.
pub struct TestStudio {
    _temp: TempDir,
    pub paths: StudioPaths,
}

impl TestStudio {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = StudioPaths::new(temp.path());
        Self { _temp: temp, paths }
    }

    /// Create a `PENDING` run with deterministic metadata at `at`.
    pub fn create_run_at(&self, phase: Phase, at: DateTime<Utc>) -> RunRecord {
        create_run(
            &self.paths,
            NewRun {
                phase,
                input: "test idea".to_string(),
                iteration_budget: 3,
                scopes: None,
                budget_cap: None,
                roles: None,
            },
            at,
        )
        .expect("create run")
    }

    /// Write `contents` to `name` (relative, may be nested) inside the run directory.
    pub fn write_artifact(&self, record: &RunRecord, name: &str, contents: &str) {
        let path = self.paths.run_dir(record.phase, &record.run_id).join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create artifact dir");
        }
        fs::write(&path, contents).expect("write artifact");
    }

    /// Write `.studio/scopes.toml` from `(name, focus, weight)` triples.
    pub fn write_scopes(&self, scopes: &[(&str, &str, i64)]) {
        let mut contents = String::new();
        for (name, focus, weight) in scopes {
            contents.push_str(&format!(
                "[[scopes]]\nname = \"{name}\"\nfocus = \"{focus}\"\nweight = {weight}\n\n"
            ));
        }
        let path = &self.paths.scopes_path;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create scopes dir");
        }
        fs::write(path, contents).expect("write scopes");
    }

    /// Write a manifest defining `roles` and a default pack listing `pack_roles`.
    pub fn seed_role_manifest(&self, roles: &[&str], pack_roles: &[&str]) {
        let role_specs: serde_json::Map<String, serde_json::Value> = roles
            .iter()
            .map(|role| {
                (
                    role.to_string(),
                    json!({
                        "advocate_focus": format!("{role} upside"),
                        "contrarian_focus": format!("{role} risk"),
                        "prompt_doc": format!("docs/role_prompts/{role}.md"),
                        "deliverables": [format!("{role} plan")],
                    }),
                )
            })
            .collect();
        let manifest = json!({
            "roles": role_specs,
            "defaults": { "studio_role_pack": TEST_ROLE_PACK },
        });
        fs::write(
            &self.paths.manifest_path,
            serde_json::to_string_pretty(&manifest).expect("manifest json"),
        )
        .expect("write manifest");

        let pack_path = self.paths.role_pack_path(TEST_ROLE_PACK);
        if let Some(parent) = pack_path.parent() {
            fs::create_dir_all(parent).expect("create role pack dir");
        }
        let pack = json!({ "roles": pack_roles });
        fs::write(
            pack_path,
            serde_json::to_string_pretty(&pack).expect("pack json"),
        )
        .expect("write role pack");
    }
}

impl Default for TestStudio {
    fn default() -> Self {
        Self::new()
    }
}

/// UTC timestamp from calendar fields.
pub fn fixed_time(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
        .single()
        .expect("valid fixed time")
}
