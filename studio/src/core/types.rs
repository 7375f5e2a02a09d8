//! Shared deterministic types for the run-lifecycle core.
//!
//! These types define the stable on-disk vocabulary (`run.json`, index rows,
//! history entries). Serialized spellings must not change without a schema bump.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StudioError;

/// Deliberation phase. `Studio` is the multi-role variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Market,
    Design,
    Tech,
    Studio,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Market, Phase::Design, Phase::Tech, Phase::Studio];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Market => "market",
            Phase::Design => "design",
            Phase::Tech => "tech",
            Phase::Studio => "studio",
        }
    }

    /// Whether artifacts are tracked per invited role.
    pub fn is_multi_role(self) -> bool {
        matches!(self, Phase::Studio)
    }

    /// Static persona text consumed by the instruction renderer.
    pub fn details(self) -> PhaseDetails {
        match self {
            Phase::Market => PhaseDetails {
                advocate: "Market Growth Strategist: steel-man the idea into a high-virality hook.",
                contrarian: "The Reality Check: hunt for fatal market flaws and issue VERDICT: APPROVED/REJECTED.",
                deliverable_owner: "Market Research Analyst",
                deliverables: &[
                    "Target audience profile with segments and motivations.",
                    "Competitor analysis table (at least 3 comparables).",
                    "Unique value proposition statement.",
                    "Go-to-market plan focused on low-cost tactics.",
                    "Success metrics to watch.",
                ],
                notes: "Stop iterating once the contrarian returns VERDICT: APPROVED, then write the implementation.",
            },
            Phase::Design => PhaseDetails {
                advocate: "Lead Systems Designer: craft the minimum viable core loop.",
                contrarian: "Scope-Creep Police: attack complexity, timeline, and missing UX safeguards.",
                deliverable_owner: "Game Design Documenter",
                deliverables: &[
                    "Annotated gameplay loop.",
                    "Progression system outline.",
                    "Key mechanics with rules and exceptions.",
                    "UI/UX wireframe descriptions for critical screens.",
                    "Technical and design constraints checklist.",
                ],
                notes: "Keep scope focused on what can be shipped in weeks, not months.",
            },
            Phase::Tech => PhaseDetails {
                advocate: "Technical Architect: define a performant architecture.",
                contrarian: "Senior SRE: flag performance, compatibility, and ops risks.",
                deliverable_owner: "Technical Architect & Code Generator",
                deliverables: &[
                    "High-level architecture description.",
                    "Technology stack with justifications and fallbacks.",
                    "Suggested file/module structure.",
                    "Key algorithm and data-structure notes.",
                    "Starter code fragment.",
                ],
                notes: "Account for platform constraints and ops toil before approving.",
            },
            Phase::Studio => PhaseDetails {
                advocate: "Studio Workflow Producer: articulate the inspiring yet actionable vision.",
                contrarian: "Bootstrapped Reality Auditor: interrogate costs, scope, and maintenance burden.",
                deliverable_owner: "Systems Integrator & Ops Lead",
                deliverables: &[],
                notes: "Iterate per role until the contrarian issues VERDICT: APPROVED, then hand off to the integrator before summarizing.",
            },
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = StudioError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let lowered = raw.trim().to_ascii_lowercase();
        Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str() == lowered)
            .ok_or_else(|| StudioError::config("phase", format!("unsupported phase '{raw}'")))
    }
}

/// Persona text for one phase.
#[derive(Debug, Clone, Copy)]
pub struct PhaseDetails {
    pub advocate: &'static str,
    pub contrarian: &'static str,
    pub deliverable_owner: &'static str,
    pub deliverables: &'static [&'static str],
    pub notes: &'static str,
}

/// Lifecycle status of a run. `Pending` until finalize sets a terminal label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Pending,
    Completed,
    Abandoned,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "PENDING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Abandoned => "ABANDONED",
            RunStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Pending)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = StudioError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(RunStatus::Pending),
            "COMPLETED" => Ok(RunStatus::Completed),
            "ABANDONED" => Ok(RunStatus::Abandoned),
            "FAILED" => Ok(RunStatus::Failed),
            _ => Err(StudioError::config(
                "status",
                format!("unknown status '{raw}' (expected COMPLETED, ABANDONED or FAILED)"),
            )),
        }
    }
}

/// Final verdict recorded at finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "APPROVED")]
    Approved,
    #[serde(rename = "REJECTED")]
    Rejected,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Approved => "APPROVED",
            Verdict::Rejected => "REJECTED",
            Verdict::NotApplicable => "N/A",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = StudioError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "APPROVED" => Ok(Verdict::Approved),
            "REJECTED" => Ok(Verdict::Rejected),
            "N/A" | "NA" => Ok(Verdict::NotApplicable),
            _ => Err(StudioError::config(
                "verdict",
                format!("unknown verdict '{raw}' (expected APPROVED, REJECTED or N/A)"),
            )),
        }
    }
}

/// Per-role progress in the multi-role phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoleStatus {
    Invited,
    Completed,
    Missing,
}

/// Identifier of an invited role (manifest key, e.g. `marketing`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(String);

impl RoleId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filename slug: spaces become `-`.
    pub fn slug(&self) -> String {
        self.0.replace(' ', "-")
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_parses_case_insensitively() {
        assert_eq!("Market".parse::<Phase>().expect("parse"), Phase::Market);
        assert_eq!(" studio ".parse::<Phase>().expect("parse"), Phase::Studio);
        let err = "ops".parse::<Phase>().unwrap_err();
        assert!(err.to_string().contains("unsupported phase 'ops'"));
    }

    #[test]
    fn only_studio_is_multi_role() {
        let multi: Vec<Phase> = Phase::ALL
            .into_iter()
            .filter(|phase| phase.is_multi_role())
            .collect();
        assert_eq!(multi, vec![Phase::Studio]);
    }

    #[test]
    fn status_serializes_uppercase() {
        let json = serde_json::to_string(&RunStatus::Completed).expect("serialize");
        assert_eq!(json, "\"COMPLETED\"");
        assert!(!RunStatus::Pending.is_terminal());
        assert_eq!("abandoned".parse::<RunStatus>().expect("parse"), RunStatus::Abandoned);
    }

    #[test]
    fn verdict_accepts_not_applicable_spellings() {
        assert_eq!("n/a".parse::<Verdict>().expect("parse"), Verdict::NotApplicable);
        assert_eq!("NA".parse::<Verdict>().expect("parse"), Verdict::NotApplicable);
        let json = serde_json::to_string(&Verdict::NotApplicable).expect("serialize");
        assert_eq!(json, "\"N/A\"");
    }

    #[test]
    fn role_slug_replaces_spaces() {
        assert_eq!(RoleId::new("live ops").slug(), "live-ops");
    }
}
