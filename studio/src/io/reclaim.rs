//! Carry out a retention plan against `output/`.
//!
//! Eviction is rename-then-delete: the run directory first becomes a hidden
//! tombstone next to it, so an interrupted delete never leaves something that
//! still looks like a run. Tombstones found on a later pass are retried first
//! and count toward the budget until they are gone.

use std::collections::BTreeMap;
use std::fs;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::retention::{
    Eviction, EvictionReason, RetentionPolicy, RunFootprint, plan_evictions,
};
use crate::core::types::Phase;
use crate::io::fs::dir_size;
use crate::io::paths::StudioPaths;
use crate::io::registry::{CorruptRun, StoredRun, list_runs, tombstone_name};

/// A leftover tombstone from an interrupted eviction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GarbageRemoval {
    pub run_id: String,
    pub phase: Phase,
    pub bytes: u64,
    /// Gone after this pass. A dry run projects every removal as succeeding.
    pub removed: bool,
}

#[derive(Debug, Clone)]
pub struct ReclaimReport {
    pub dry_run: bool,
    pub policy: RetentionPolicy,
    /// Resolvable runs scanned.
    pub scanned_runs: usize,
    /// Bytes held by scanned runs plus leftover tombstones.
    pub total_bytes: u64,
    pub evictions: Vec<Eviction>,
    pub garbage: Vec<GarbageRemoval>,
    pub corrupt: Vec<CorruptRun>,
    pub errors: Vec<String>,
}

impl ReclaimReport {
    /// Bytes released (or that would be released on a dry run).
    pub fn freed_bytes(&self) -> u64 {
        let evicted: u64 = self.evictions.iter().map(|eviction| eviction.bytes).sum();
        let garbage: u64 = self
            .garbage
            .iter()
            .filter(|item| item.removed)
            .map(|item| item.bytes)
            .sum();
        evicted + garbage
    }

    pub fn reason_counts(&self) -> BTreeMap<EvictionReason, usize> {
        let mut counts = BTreeMap::new();
        for eviction in &self.evictions {
            *counts.entry(eviction.reason).or_insert(0) += 1;
        }
        counts
    }

    /// Nothing evicted and no tombstones pending.
    pub fn is_empty(&self) -> bool {
        self.evictions.is_empty() && self.garbage.is_empty()
    }
}

/// Apply `policy` to every run under `paths.output_dir`.
///
/// Deletion failures are collected into the report rather than returned; only
/// a failure to scan `output/` is an error.
pub fn reclaim(
    paths: &StudioPaths,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
    dry_run: bool,
) -> Result<ReclaimReport> {
    let inventory = list_runs(paths)?;
    let mut errors = Vec::new();

    let mut garbage = Vec::new();
    let mut pending_garbage_bytes = 0u64;
    for tombstone in &inventory.tombstones {
        let bytes = dir_size(&tombstone.dir);
        // A dry run plans against the state a real pass would leave behind.
        let removed = if dry_run {
            true
        } else {
            match fs::remove_dir_all(&tombstone.dir) {
                Ok(()) => {
                    info!(run_id = %tombstone.run_id, bytes, "removed leftover tombstone");
                    true
                }
                Err(err) => {
                    errors.push(format!("failed to remove {}: {err}", tombstone.dir.display()));
                    false
                }
            }
        };
        if !removed {
            pending_garbage_bytes += bytes;
        }
        garbage.push(GarbageRemoval {
            run_id: tombstone.run_id.clone(),
            phase: tombstone.phase,
            bytes,
            removed,
        });
    }

    let footprints: Vec<RunFootprint> = inventory.runs.iter().map(footprint).collect();
    let run_bytes: u64 = footprints.iter().map(|run| run.size_bytes).sum();
    let garbage_bytes: u64 = garbage.iter().map(|item| item.bytes).sum();
    let plan = plan_evictions(&footprints, policy, now, pending_garbage_bytes);
    debug!(runs = footprints.len(), planned = plan.len(), dry_run, "retention plan");

    let mut evictions = Vec::new();
    for eviction in plan {
        if dry_run {
            evictions.push(eviction);
            continue;
        }
        match evict(paths, &eviction) {
            Ok(()) => evictions.push(eviction),
            Err(message) => errors.push(message),
        }
    }

    Ok(ReclaimReport {
        dry_run,
        policy: *policy,
        scanned_runs: footprints.len(),
        total_bytes: run_bytes + garbage_bytes,
        evictions,
        garbage,
        corrupt: inventory.corrupt,
        errors,
    })
}

fn footprint(run: &StoredRun) -> RunFootprint {
    RunFootprint {
        run_id: run.record.run_id.clone(),
        phase: run.record.phase,
        created_at: run.record.created_at,
        size_bytes: dir_size(&run.dir),
    }
}

/// Rename to a tombstone, then delete. Once renamed the run is gone from every
/// listing even if the delete fails; the tombstone is retried next pass.
fn evict(paths: &StudioPaths, eviction: &Eviction) -> Result<(), String> {
    let run_dir = paths.run_dir(eviction.phase, &eviction.run_id);
    let tombstone = paths
        .phase_dir(eviction.phase)
        .join(tombstone_name(&eviction.run_id));
    fs::rename(&run_dir, &tombstone)
        .map_err(|err| format!("failed to delete {}: {err}", run_dir.display()))?;
    info!(
        run_id = %eviction.run_id,
        reason = %eviction.reason,
        bytes = eviction.bytes,
        "evicting run"
    );
    if let Err(err) = fs::remove_dir_all(&tombstone) {
        warn!(path = %tombstone.display(), error = %err, "tombstone left behind");
        return Err(format!(
            "evicted {} but failed to remove {}: {err}",
            eviction.run_id,
            tombstone.display()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestStudio, fixed_time};
    use chrono::Duration;

    const KB: u64 = 1024;

    fn policy(ttl_days: Option<i64>, limit: Option<u64>) -> RetentionPolicy {
        RetentionPolicy {
            ttl: ttl_days.map(Duration::days),
            size_limit: limit,
        }
    }

    #[test]
    fn dry_run_reports_without_deleting() {
        let studio = TestStudio::new();
        let old = studio.create_run_at(Phase::Market, fixed_time(2025, 1, 1, 0, 0, 0));
        studio.write_artifact(&old, "summary.md", &"x".repeat(2048));
        let now = fixed_time(2025, 3, 1, 0, 0, 0);

        let report = reclaim(&studio.paths, &policy(Some(30), None), now, true).expect("reclaim");
        assert_eq!(report.evictions.len(), 1);
        assert_eq!(report.evictions[0].reason, EvictionReason::Ttl);
        assert!(report.freed_bytes() >= 2048);
        assert!(studio.paths.run_dir(Phase::Market, &old.run_id).is_dir());
    }

    #[test]
    fn evicts_and_second_pass_is_empty() {
        let studio = TestStudio::new();
        let old = studio.create_run_at(Phase::Market, fixed_time(2025, 1, 1, 0, 0, 0));
        let mid = studio.create_run_at(Phase::Design, fixed_time(2025, 2, 24, 0, 0, 0));
        let new = studio.create_run_at(Phase::Tech, fixed_time(2025, 2, 25, 0, 0, 0));
        studio.write_artifact(&mid, "summary.md", &"m".repeat(8 * KB as usize));
        studio.write_artifact(&new, "summary.md", &"n".repeat(8 * KB as usize));
        let now = fixed_time(2025, 3, 1, 0, 0, 0);
        let policy = policy(Some(30), Some(12 * KB));

        let report = reclaim(&studio.paths, &policy, now, false).expect("reclaim");
        let evicted: Vec<(&str, EvictionReason)> = report
            .evictions
            .iter()
            .map(|e| (e.run_id.as_str(), e.reason))
            .collect();
        assert_eq!(
            evicted,
            vec![
                (old.run_id.as_str(), EvictionReason::Ttl),
                (mid.run_id.as_str(), EvictionReason::Budget),
            ]
        );
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert!(!studio.paths.run_dir(Phase::Market, &old.run_id).exists());
        assert!(!studio.paths.run_dir(Phase::Design, &mid.run_id).exists());
        assert!(studio.paths.run_dir(Phase::Tech, &new.run_id).is_dir());

        let again = reclaim(&studio.paths, &policy, now, false).expect("reclaim");
        assert!(again.is_empty());
    }

    #[test]
    fn leftover_tombstone_counts_and_is_retried_first() {
        let studio = TestStudio::new();
        let run = studio.create_run_at(Phase::Market, fixed_time(2025, 2, 28, 0, 0, 0));
        studio.write_artifact(&run, "summary.md", &"r".repeat(KB as usize));
        let tomb = studio
            .paths
            .phase_dir(Phase::Market)
            .join(tombstone_name("run_market_20250101_000000"));
        fs::create_dir_all(&tomb).expect("mkdir");
        fs::write(tomb.join("advocate_1.md"), vec![b'g'; 4 * KB as usize]).expect("write");
        let now = fixed_time(2025, 3, 1, 0, 0, 0);

        // Dry run: the tombstone is projected gone, so the run fits.
        let report =
            reclaim(&studio.paths, &policy(None, Some(4 * KB)), now, true).expect("reclaim");
        assert_eq!(report.garbage.len(), 1);
        assert!(report.garbage[0].removed);
        assert!(report.evictions.is_empty());
        assert!(report.total_bytes >= 5 * KB);
        assert!(tomb.is_dir());

        // Real pass: tombstone goes first and the run then fits.
        let report =
            reclaim(&studio.paths, &policy(None, Some(4 * KB)), now, false).expect("reclaim");
        assert!(report.garbage[0].removed);
        assert!(report.evictions.is_empty());
        assert!(!tomb.exists());
        assert!(studio.paths.run_dir(Phase::Market, &run.run_id).is_dir());
    }

    fn seed_mixed_tree(studio: &TestStudio) {
        let old = studio.create_run_at(Phase::Market, fixed_time(2025, 1, 1, 0, 0, 0));
        let mid = studio.create_run_at(Phase::Design, fixed_time(2025, 2, 20, 0, 0, 0));
        let new = studio.create_run_at(Phase::Tech, fixed_time(2025, 2, 27, 0, 0, 0));
        studio.write_artifact(&old, "summary.md", &"o".repeat(KB as usize));
        studio.write_artifact(&mid, "summary.md", &"m".repeat(6 * KB as usize));
        studio.write_artifact(&new, "summary.md", &"n".repeat(6 * KB as usize));
        let tomb = studio
            .paths
            .phase_dir(Phase::Design)
            .join(tombstone_name("run_design_20241201_000000"));
        fs::create_dir_all(&tomb).expect("mkdir");
        fs::write(tomb.join("advocate_1.md"), vec![b'g'; 3 * KB as usize]).expect("write");
    }

    #[test]
    fn dry_run_matches_real_pass() {
        let dry_studio = TestStudio::new();
        let real_studio = TestStudio::new();
        seed_mixed_tree(&dry_studio);
        seed_mixed_tree(&real_studio);
        let now = fixed_time(2025, 3, 1, 0, 0, 0);
        let policy = policy(Some(30), Some(10 * KB));

        let dry = reclaim(&dry_studio.paths, &policy, now, true).expect("dry reclaim");
        let real = reclaim(&real_studio.paths, &policy, now, false).expect("reclaim");
        assert!(real.errors.is_empty(), "{:?}", real.errors);
        assert_eq!(dry.evictions, real.evictions);
        assert_eq!(dry.garbage, real.garbage);
        assert_eq!(dry.scanned_runs, real.scanned_runs);
        assert_eq!(dry.total_bytes, real.total_bytes);
        assert_eq!(dry.freed_bytes(), real.freed_bytes());
        assert_eq!(real.reason_counts().get(&EvictionReason::Ttl), Some(&1));
    }

    #[test]
    fn corrupt_runs_are_reported_not_deleted() {
        let studio = TestStudio::new();
        let broken = studio.paths.run_dir(Phase::Market, "run_market_20200101_000000");
        fs::create_dir_all(&broken).expect("mkdir");
        fs::write(broken.join("run.json"), "{ not json").expect("write");
        let now = fixed_time(2025, 3, 1, 0, 0, 0);

        let report = reclaim(&studio.paths, &policy(Some(1), Some(1)), now, false).expect("reclaim");
        assert_eq!(report.corrupt.len(), 1);
        assert!(report.evictions.is_empty());
        assert!(broken.is_dir());
    }
}
