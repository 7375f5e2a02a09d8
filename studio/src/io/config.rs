//! Studio settings stored under `config/studio_settings.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::core::retention::RetentionPolicy;
use crate::error::StudioError;
use crate::io::fs::write_atomic;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Studio settings (TOML).
///
/// Edited by humans; missing fields default to the documented values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct StudioConfig {
    pub cleanup: CleanupConfig,
    pub prepare: PrepareConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CleanupConfig {
    /// Runs older than this many days expire. `0` disables the TTL pass.
    pub ttl_days: u32,

    /// Total budget for `output/` in megabytes. `0` disables the budget pass.
    pub size_limit_mb: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            ttl_days: 30,
            size_limit_mb: 900,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PrepareConfig {
    /// Iteration budget used when `prepare` is not given one.
    pub max_iterations: u32,

    /// Budget label recorded on multi-role runs.
    pub budget_cap: String,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            budget_cap: "$0-20/mo".to_string(),
        }
    }
}

impl StudioConfig {
    pub fn validate(&self) -> Result<(), StudioError> {
        if self.prepare.max_iterations == 0 {
            return Err(StudioError::config(
                "prepare.max_iterations",
                "must be > 0",
            ));
        }
        if self.cleanup.size_limit_mb.checked_mul(BYTES_PER_MB).is_none() {
            return Err(StudioError::config(
                "cleanup.size_limit_mb",
                format!("{} is too large", self.cleanup.size_limit_mb),
            ));
        }
        Ok(())
    }

    /// Retention policy for this process; zero values disable a pass.
    pub fn retention_policy(&self) -> RetentionPolicy {
        let ttl = (self.cleanup.ttl_days > 0)
            .then(|| Duration::days(i64::from(self.cleanup.ttl_days)));
        let size_limit = (self.cleanup.size_limit_mb > 0)
            .then(|| self.cleanup.size_limit_mb.saturating_mul(BYTES_PER_MB));
        RetentionPolicy { ttl, size_limit }
    }
}

/// Load settings from a TOML file.
///
/// If the file is missing, returns `StudioConfig::default()`.
pub fn load_config(path: &Path) -> Result<StudioConfig> {
    if !path.exists() {
        return Ok(StudioConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|err| StudioError::io(path, err))?;
    let cfg: StudioConfig = toml::from_str(&contents).map_err(|err| {
        StudioError::config(
            "studio_settings",
            format!("parse {}: {}", path.display(), err.message()),
        )
    })?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write settings to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &StudioConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize settings toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}
