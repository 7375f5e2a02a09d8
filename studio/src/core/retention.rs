//! Retention planning: which runs to evict under a TTL and a storage budget.
//!
//! Planning is pure over measured footprints and an explicit `now`; the I/O
//! layer (`io::reclaim`) measures directories and carries out the plan.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::core::types::Phase;

/// Immutable for the duration of one reclaim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Runs created more than `ttl` before `now` expire. `None` disables the pass.
    pub ttl: Option<Duration>,
    /// Upper bound on total surviving bytes. `None` disables the pass.
    pub size_limit: Option<u64>,
}

/// Why a run was evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EvictionReason {
    Ttl,
    Budget,
}

impl EvictionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            EvictionReason::Ttl => "TTL",
            EvictionReason::Budget => "BUDGET",
        }
    }
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measured state of one resolvable run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFootprint {
    pub run_id: String,
    pub phase: Phase,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// A planned eviction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eviction {
    pub run_id: String,
    pub phase: Phase,
    pub reason: EvictionReason,
    pub bytes: u64,
}

/// Plan evictions: TTL pass first, then oldest-first budget pass over survivors.
///
/// `garbage_bytes` is space held by half-deleted directories from earlier
/// passes; it counts toward the budget total but cannot itself be selected.
pub fn plan_evictions(
    runs: &[RunFootprint],
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
    garbage_bytes: u64,
) -> Vec<Eviction> {
    let mut evictions = Vec::new();
    let mut evicted: BTreeSet<&str> = BTreeSet::new();

    // A TTL reaching past the earliest representable time expires nothing.
    if let Some(cutoff) = policy.ttl.and_then(|ttl| now.checked_sub_signed(ttl)) {
        for run in runs {
            if run.created_at < cutoff {
                evictions.push(eviction(run, EvictionReason::Ttl));
                evicted.insert(run.run_id.as_str());
            }
        }
    }

    if let Some(limit) = policy.size_limit {
        let mut survivors: Vec<&RunFootprint> = runs
            .iter()
            .filter(|run| !evicted.contains(run.run_id.as_str()))
            .collect();
        survivors.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.run_id.cmp(&b.run_id))
        });
        let mut total: u64 = garbage_bytes
            + survivors.iter().map(|run| run.size_bytes).sum::<u64>();
        for run in survivors {
            if total <= limit {
                break;
            }
            evictions.push(eviction(run, EvictionReason::Budget));
            total = total.saturating_sub(run.size_bytes);
        }
    }

    evictions
}

fn eviction(run: &RunFootprint, reason: EvictionReason) -> Eviction {
    Eviction {
        run_id: run.run_id.clone(),
        phase: run.phase,
        reason,
        bytes: run.size_bytes,
    }
}

/// Human-readable size with binary units and one decimal.
pub fn format_bytes(num_bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = num_bytes as f64;
    for unit in &UNITS[..UNITS.len() - 1] {
        if value < 1024.0 {
            return format!("{value:.1}{unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1}TB")
}
