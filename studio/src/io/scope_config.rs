//! Scope configuration (`.studio/scopes.toml` or `--scope-config`).

use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use tracing::debug;

use crate::core::scopes::{ScopeConfig, ScopeWeight};
use crate::error::StudioError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScopeFile {
    #[serde(default)]
    scopes: Vec<ScopeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScopeEntry {
    name: String,
    focus: String,
    #[serde(alias = "max_iterations")]
    weight: i64,
}

/// Where the scope configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeSource<'a> {
    /// The conventional location; absence means "no scopes".
    Default(&'a Path),
    /// Supplied by the operator; absence is an error.
    Explicit(&'a Path),
}

/// Load and validate a scope configuration. `Ok(None)` only for a missing
/// default file.
pub fn load_scope_config(source: ScopeSource<'_>) -> Result<Option<ScopeConfig>> {
    let (path, explicit) = match source {
        ScopeSource::Default(path) => (path, false),
        ScopeSource::Explicit(path) => (path, true),
    };
    if !path.exists() {
        if explicit {
            return Err(StudioError::config(
                "scope_config",
                format!("scope configuration not found: {}", path.display()),
            )
            .into());
        }
        debug!(path = %path.display(), "no scope configuration");
        return Ok(None);
    }
    let contents = fs::read_to_string(path).map_err(|err| StudioError::io(path, err))?;
    Ok(Some(parse_scope_config(&contents, path)?))
}

fn parse_scope_config(contents: &str, path: &Path) -> Result<ScopeConfig, StudioError> {
    let file: ScopeFile = toml::from_str(contents).map_err(|err| {
        StudioError::config(
            "scope_config",
            format!("parse {}: {}", path.display(), err.message()),
        )
    })?;
    for (idx, entry) in file.scopes.iter().enumerate() {
        if entry.focus.trim().is_empty() {
            return Err(StudioError::config(
                format!("scopes[{idx}].focus"),
                format!("scope '{}' needs focus text", entry.name),
            ));
        }
    }
    let config = ScopeConfig {
        scopes: file
            .scopes
            .into_iter()
            .map(|entry| ScopeWeight {
                name: entry.name.trim().to_string(),
                focus: entry.focus.trim().to_string(),
                weight: entry.weight,
            })
            .collect(),
    };
    config.validate()?;
    Ok(config)
}
