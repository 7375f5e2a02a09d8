//! Role manifest (`studio.manifest.json`) and role packs (`role_packs/*.json`).
//!
//! Only the multi-role phase reads these. The roster is resolved once at
//! prepare and frozen into `run.json`; later manifest edits never change what
//! a run is validated against.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::core::record::RoleRoster;
use crate::core::types::RoleId;
use crate::error::StudioError;
use crate::io::paths::StudioPaths;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RoleManifest {
    #[serde(default)]
    pub roles: BTreeMap<String, RoleSpec>,
    #[serde(default)]
    pub defaults: ManifestDefaults,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ManifestDefaults {
    pub studio_role_pack: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RoleSpec {
    pub title: Option<String>,
    pub advocate_focus: String,
    pub contrarian_focus: String,
    pub prompt_doc: String,
    pub deliverables: Vec<String>,
    pub escalate_on: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RolePack {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Resolved persona for one invited role, consumed by the instruction renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDetails {
    pub id: RoleId,
    pub title: String,
    pub advocate_focus: String,
    pub contrarian_focus: String,
    pub prompt_doc: String,
    pub deliverables: Vec<String>,
    pub escalate_on: Vec<String>,
}

impl RoleManifest {
    pub fn default_pack(&self) -> Result<&str, StudioError> {
        self.defaults
            .studio_role_pack
            .as_deref()
            .filter(|pack| !pack.trim().is_empty())
            .ok_or_else(|| {
                StudioError::config("defaults.studio_role_pack", "missing from role manifest")
            })
    }

    pub fn details(&self, role: &RoleId) -> Result<RoleDetails, StudioError> {
        let spec = self.roles.get(role.as_str()).ok_or_else(|| unknown_role(role.as_str()))?;
        Ok(RoleDetails {
            id: role.clone(),
            title: spec.title.clone().unwrap_or_else(|| title_case(role.as_str())),
            advocate_focus: spec.advocate_focus.clone(),
            contrarian_focus: spec.contrarian_focus.clone(),
            prompt_doc: spec.prompt_doc.clone(),
            deliverables: spec.deliverables.clone(),
            escalate_on: spec.escalate_on.clone(),
        })
    }
}

pub fn load_manifest(paths: &StudioPaths) -> Result<RoleManifest> {
    read_json(&paths.manifest_path, "manifest", "role manifest")
}

pub fn load_role_pack(paths: &StudioPaths, pack: &str) -> Result<RolePack> {
    read_json(&paths.role_pack_path(pack), "role_pack", &format!("role pack '{pack}'"))
}

/// Apply `+role` / `-role` overrides to the pack's role list.
pub fn resolve_roles(
    manifest: &RoleManifest,
    pack: &RolePack,
    overrides: &[String],
) -> Result<Vec<RoleId>, StudioError> {
    let mut selected: Vec<String> = Vec::new();
    for role in &pack.roles {
        if !manifest.roles.contains_key(role) {
            return Err(unknown_role(role));
        }
        if !selected.contains(role) {
            selected.push(role.clone());
        }
    }
    for token in overrides {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let (include, role) = if let Some(role) = token.strip_prefix('+') {
            (true, role)
        } else if let Some(role) = token.strip_prefix('-') {
            (false, role)
        } else {
            return Err(StudioError::config(
                "roles",
                format!("override '{token}' must start with '+' (include) or '-' (exclude)"),
            ));
        };
        if !manifest.roles.contains_key(role) {
            return Err(unknown_role(role));
        }
        if include {
            if !selected.iter().any(|existing| existing == role) {
                selected.push(role.to_string());
            }
        } else {
            selected.retain(|existing| existing != role);
        }
    }
    if selected.is_empty() {
        return Err(StudioError::config(
            "roles",
            "resolved role roster is empty; add roles to the pack or use +role",
        ));
    }
    Ok(selected.into_iter().map(RoleId::new).collect())
}

/// Load the manifest and pack and resolve the invited roster.
pub fn resolve_roster(
    paths: &StudioPaths,
    pack: Option<&str>,
    overrides: &[String],
) -> Result<(RoleRoster, Vec<RoleDetails>)> {
    let manifest = load_manifest(paths)?;
    let pack_name = match pack {
        Some(pack) => pack.to_string(),
        None => manifest.default_pack()?.to_string(),
    };
    let role_pack = load_role_pack(paths, &pack_name)?;
    let invited = resolve_roles(&manifest, &role_pack, overrides)?;
    let details = invited
        .iter()
        .map(|role| manifest.details(role))
        .collect::<Result<Vec<_>, _>>()?;
    let roster = RoleRoster {
        pack: pack_name,
        overrides: overrides
            .iter()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .collect(),
        invited,
    };
    Ok((roster, details))
}

fn read_json<T: DeserializeOwned>(path: &Path, field: &str, label: &str) -> Result<T> {
    if !path.exists() {
        return Err(StudioError::config(
            field,
            format!("{label} not found at {}", path.display()),
        )
        .into());
    }
    let contents = fs::read_to_string(path).map_err(|err| StudioError::io(path, err))?;
    let value = serde_json::from_str(&contents).map_err(|err| {
        StudioError::config(field, format!("{label} at {} is not valid: {err}", path.display()))
    })?;
    Ok(value)
}

fn unknown_role(role: &str) -> StudioError {
    StudioError::config("roles", format!("role '{role}' is not defined in the manifest"))
}

fn title_case(raw: &str) -> String {
    raw.split(['_', ' ', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
