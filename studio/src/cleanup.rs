//! Orchestration for `studio cleanup` and the pre-prepare cleanup pass.

use std::env;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::core::retention::{RetentionPolicy, format_bytes};
use crate::io::config::{StudioConfig, load_config};
use crate::io::index_store::rebuild_index;
use crate::io::paths::StudioPaths;
use crate::io::reclaim::{ReclaimReport, reclaim};

/// Skip the cleanup pass that normally precedes `prepare`.
pub const SKIP_CLEANUP_ENV: &str = "STUDIO_SKIP_CLEANUP";
/// Make every cleanup pass a dry run.
pub const CLEANUP_DRY_RUN_ENV: &str = "STUDIO_CLEANUP_DRY_RUN";

/// `1|true|yes|on`, case-insensitive.
pub fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}

/// Load settings from the studio root and reclaim.
pub fn cleanup_runs(paths: &StudioPaths, now: DateTime<Utc>, dry_run: bool) -> Result<ReclaimReport> {
    let config = load_config(&paths.settings_path).context("load studio settings")?;
    run_cleanup(paths, &config, now, dry_run)
}

/// Reclaim under `config`'s policy; the index is rebuilt if any run was touched.
pub fn run_cleanup(
    paths: &StudioPaths,
    config: &StudioConfig,
    now: DateTime<Utc>,
    dry_run: bool,
) -> Result<ReclaimReport> {
    let policy = config.retention_policy();
    let report = reclaim(paths, &policy, now, dry_run)?;
    // A failed delete still renamed the run away, so errors count too.
    if !dry_run && (!report.evictions.is_empty() || !report.errors.is_empty()) {
        rebuild_index(paths).context("rebuild index after cleanup")?;
    }
    info!(
        evicted = report.evictions.len(),
        freed = report.freed_bytes(),
        dry_run,
        "cleanup finished"
    );
    Ok(report)
}

/// Operator-facing report text.
pub fn render_report(report: &ReclaimReport) -> String {
    let mut lines = Vec::new();
    if report.scanned_runs == 0 && report.garbage.is_empty() && report.corrupt.is_empty() {
        lines.push("Cleanup: no prior runs detected.".to_string());
        return lines.join("\n");
    }
    lines.push(format!(
        "Cleanup: scanned {} runs ({})",
        report.scanned_runs,
        format_bytes(report.total_bytes)
    ));
    lines.push(format!("- Policy: {}", describe_policy(&report.policy)));

    let verb = if report.dry_run { "Would remove" } else { "Removed" };
    if report.evictions.is_empty() {
        lines.push("- No deletions required.".to_string());
    } else {
        let evicted_bytes: u64 = report.evictions.iter().map(|eviction| eviction.bytes).sum();
        let reasons = report
            .reason_counts()
            .iter()
            .map(|(reason, count)| format!("{reason}={count}"))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!(
            "- {verb} {} runs ({}) [{reasons}]",
            report.evictions.len(),
            format_bytes(evicted_bytes)
        ));
        for eviction in &report.evictions {
            lines.push(format!(
                "  - {}/{} {} ({})",
                eviction.phase,
                eviction.run_id,
                eviction.reason,
                format_bytes(eviction.bytes)
            ));
        }
    }

    if !report.garbage.is_empty() {
        let pending = report.garbage.iter().filter(|item| !item.removed).count();
        let bytes: u64 = report.garbage.iter().map(|item| item.bytes).sum();
        if report.dry_run {
            lines.push(format!(
                "- {verb} {} leftover tombstones ({})",
                report.garbage.len(),
                format_bytes(bytes)
            ));
        } else {
            lines.push(format!(
                "- Leftover tombstones: {} removed, {pending} pending ({})",
                report.garbage.len() - pending,
                format_bytes(bytes)
            ));
        }
    }
    for corrupt in &report.corrupt {
        lines.push(format!(
            "- Skipped unreadable run {}/{}: {}",
            corrupt.phase, corrupt.name, corrupt.reason
        ));
    }
    for message in &report.errors {
        lines.push(format!("- Cleanup warning: {message}"));
    }
    lines.join("\n")
}

fn describe_policy(policy: &RetentionPolicy) -> String {
    let ttl = match policy.ttl {
        Some(ttl) => format!("ttl {} days", ttl.num_days()),
        None => "ttl disabled".to_string(),
    };
    let budget = match policy.size_limit {
        Some(limit) => format!("budget {}", format_bytes(limit)),
        None => "budget disabled".to_string(),
    };
    format!("{ttl}, {budget}")
}
