//! Canonical on-disk layout under the studio root.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::types::Phase;

/// Environment variable overriding the studio root.
pub const ROOT_ENV: &str = "STUDIO_ROOT";

pub const RECORD_FILE: &str = "run.json";
pub const INSTRUCTIONS_FILE: &str = "instructions.md";

/// All canonical paths for a studio root.
#[derive(Debug, Clone)]
pub struct StudioPaths {
    pub root: PathBuf,
    pub output_dir: PathBuf,
    pub index_path: PathBuf,
    pub knowledge_dir: PathBuf,
    pub history_path: PathBuf,
    pub settings_path: PathBuf,
    pub scopes_path: PathBuf,
    pub manifest_path: PathBuf,
    pub role_packs_dir: PathBuf,
}

impl StudioPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let output_dir = root.join("output");
        let knowledge_dir = root.join("knowledge");
        Self {
            root: root.clone(),
            output_dir: output_dir.clone(),
            index_path: output_dir.join("index.md"),
            knowledge_dir: knowledge_dir.clone(),
            history_path: knowledge_dir.join("run_log.md"),
            settings_path: root.join("config").join("studio_settings.toml"),
            scopes_path: root.join(".studio").join("scopes.toml"),
            manifest_path: root.join("studio.manifest.json"),
            role_packs_dir: root.join("role_packs"),
        }
    }

    /// Resolve the root from `STUDIO_ROOT`, falling back to the current directory.
    pub fn from_env() -> Result<Self> {
        let cwd = env::current_dir().context("read current directory")?;
        let root = match env::var_os(ROOT_ENV) {
            Some(raw) if !raw.is_empty() => {
                let path = PathBuf::from(raw);
                if path.is_absolute() {
                    path
                } else {
                    cwd.join(path)
                }
            }
            _ => cwd,
        };
        Ok(Self::new(root))
    }

    pub fn phase_dir(&self, phase: Phase) -> PathBuf {
        self.output_dir.join(phase.as_str())
    }

    pub fn run_dir(&self, phase: Phase, run_id: &str) -> PathBuf {
        self.phase_dir(phase).join(run_id)
    }

    pub fn record_path(&self, phase: Phase, run_id: &str) -> PathBuf {
        self.run_dir(phase, run_id).join(RECORD_FILE)
    }

    pub fn role_pack_path(&self, pack: &str) -> PathBuf {
        self.role_packs_dir.join(format!("{pack}.json"))
    }
}

/// Render `path` relative to `base` when possible, for operator-facing output.
pub fn display_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}
