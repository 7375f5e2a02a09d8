//! The persisted run record (`run.json`).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::checklist::SUMMARY_FILE;
use crate::core::scopes::ScopeAllocation;
use crate::core::types::{Phase, RoleId, RoleStatus, RunStatus, Verdict};

/// Invited roster for the multi-role phase, resolved once at prepare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRoster {
    pub pack: String,
    pub overrides: Vec<String>,
    pub invited: Vec<RoleId>,
}

/// One run. Created by prepare, mutated by finalize, removed only by reclaim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub phase: Phase,
    /// Seed text the run was prepared with.
    pub input: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub iteration_budget: u32,
    pub scopes: Option<ScopeAllocation>,
    pub budget_cap: Option<String>,
    pub roles: Option<RoleRoster>,
    pub role_status: Option<BTreeMap<RoleId, RoleStatus>>,
    pub verdict: Option<Verdict>,
    pub iterations_run: Option<u32>,
    pub hours: Option<f64>,
    pub cost: Option<f64>,
    /// Summary file relative to the run directory; set at finalize.
    pub summary_path: Option<String>,
}

impl RunRecord {
    /// Fresh `PENDING` record.
    pub fn new(
        run_id: String,
        phase: Phase,
        input: String,
        created_at: DateTime<Utc>,
        iteration_budget: u32,
    ) -> Self {
        Self {
            run_id,
            phase,
            input,
            status: RunStatus::Pending,
            created_at,
            updated_at: created_at,
            iteration_budget,
            scopes: None,
            budget_cap: None,
            roles: None,
            role_status: None,
            verdict: None,
            iterations_run: None,
            hours: None,
            cost: None,
            summary_path: None,
        }
    }

    /// Summary file to check: the recorded override or `summary.md`.
    pub fn summary_file(&self) -> &str {
        self.summary_path.as_deref().unwrap_or(SUMMARY_FILE)
    }

    /// Invited roster; empty for single-role phases.
    pub fn invited_roles(&self) -> &[RoleId] {
        self.roles
            .as_ref()
            .map(|roster| roster.invited.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_record_is_pending_with_matching_timestamps() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let record = RunRecord::new(
            "run_market_20250101_000000".to_string(),
            Phase::Market,
            "idea".to_string(),
            at,
            3,
        );
        assert_eq!(record.status, RunStatus::Pending);
        assert_eq!(record.updated_at, record.created_at);
        assert_eq!(record.summary_file(), "summary.md");
        assert!(record.invited_roles().is_empty());
    }

    #[test]
    fn serializes_timestamps_as_rfc3339() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 8, 30, 0).unwrap();
        let record = RunRecord::new("id".to_string(), Phase::Tech, "x".to_string(), at, 1);
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["created_at"], "2025-01-01T08:30:00Z");
        assert_eq!(json["status"], "PENDING");
        assert!(json["verdict"].is_null());
    }
}
