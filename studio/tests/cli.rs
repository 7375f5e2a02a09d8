//! CLI tests for the `studio` binary.
//!
//! Spawns the binary against a temporary `STUDIO_ROOT` and verifies exit codes
//! and the product output printed to stdout.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use studio::core::types::Phase;
use studio::exit_codes;
use studio::io::paths::StudioPaths;
use studio::test_support::{TestStudio, fixed_time};

fn studio_cmd(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_studio"))
        .env("STUDIO_ROOT", root)
        .env_remove("STUDIO_SKIP_CLEANUP")
        .env_remove("STUDIO_CLEANUP_DRY_RUN")
        .args(args)
        .output()
        .expect("run studio")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn prepare_prints_run_id_and_exits_ok() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = studio_cmd(
        temp.path(),
        &["prepare", "--phase", "market", "--text", "idle farming", "--skip-cleanup"],
    );
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let text = stdout(&output);
    assert!(text.starts_with("Prepared run_market_"), "{text}");
    assert!(text.contains("- Instructions: "));
    assert!(StudioPaths::new(temp.path()).index_path.is_file());
}

#[test]
fn finalize_with_missing_summary_exits_validation_failed() {
    let studio = TestStudio::new();
    let record = studio.create_run_at(Phase::Tech, fixed_time(2025, 3, 1, 9, 0, 0));
    studio.write_artifact(&record, "advocate_1.md", "pitch");
    studio.write_artifact(&record, "contrarian_1.md", "VERDICT: APPROVED");
    studio.write_artifact(&record, "implementation.md", "plan");

    let output = studio_cmd(
        &studio.paths.root,
        &["finalize", "--phase", "tech", "--run-id", &record.run_id],
    );
    assert_eq!(output.status.code(), Some(exit_codes::VALIDATION_FAILED));
    assert!(stdout(&output).contains("- summary.md"));

    studio.write_artifact(&record, "summary.md", "wrap-up");
    let output = studio_cmd(
        &studio.paths.root,
        &[
            "finalize",
            "--phase",
            "tech",
            "--run-id",
            &record.run_id,
            "--verdict",
            "APPROVED",
            "--hours",
            "2.5",
        ],
    );
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains(&format!("Finalized {} (tech) → COMPLETED", record.run_id)));
}

#[test]
fn existing_run_directory_exits_collision() {
    let studio = TestStudio::new();
    // Occupy every run id the binary could compute over the next few seconds.
    let now = chrono::Utc::now();
    for offset in 0..5 {
        let at = now + chrono::Duration::seconds(offset);
        let run_id = studio::core::run_id::format_run_id(Phase::Design, at);
        std::fs::create_dir_all(studio.paths.run_dir(Phase::Design, &run_id)).expect("occupy");
    }

    let output = studio_cmd(
        &studio.paths.root,
        &["prepare", "--phase", "design", "--text", "duel", "--skip-cleanup"],
    );
    assert_eq!(output.status.code(), Some(exit_codes::COLLISION));
    assert!(String::from_utf8_lossy(&output.stderr).contains("retry"));
}

#[test]
fn unknown_run_and_bad_config_exit_invalid() {
    let studio = TestStudio::new();
    let output = studio_cmd(
        &studio.paths.root,
        &["validate", "--phase", "market", "--run-id", "run_market_20250101_000000"],
    );
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));

    let output = studio_cmd(
        &studio.paths.root,
        &["prepare", "--phase", "market", "--text", "   ", "--skip-cleanup"],
    );
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("`text`"));
}

#[test]
fn cleanup_always_exits_ok() {
    let studio = TestStudio::new();
    let output = studio_cmd(&studio.paths.root, &["cleanup", "--dry-run"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("Cleanup: no prior runs detected."));
}

#[test]
fn cleanup_with_broken_settings_warns_and_exits_ok() {
    let studio = TestStudio::new();
    let settings = &studio.paths.settings_path;
    fs::create_dir_all(settings.parent().expect("settings dir")).expect("mkdir");
    fs::write(settings, "[cleanup\nttl_days = ").expect("write settings");

    let output = studio_cmd(&studio.paths.root, &["cleanup"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let text = stdout(&output);
    assert!(text.contains("Cleanup: failed"), "{text}");
    assert!(text.contains("- Cleanup warning: load studio settings"), "{text}");
}

#[test]
fn validate_and_rerun_are_read_only() {
    let studio = TestStudio::new();
    let record = studio.create_run_at(Phase::Market, fixed_time(2025, 3, 1, 9, 0, 0));
    studio.write_artifact(
        &record,
        "contrarian_1.md",
        "VERDICT: REJECTED\n1. Monetization depends on ads the audience hates\n",
    );

    let output = studio_cmd(
        &studio.paths.root,
        &["validate", "--phase", "market", "--run-id", &record.run_id],
    );
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains(": FAIL"));

    let output = studio_cmd(
        &studio.paths.root,
        &["rerun", "--phase", "market", "--run-id", &record.run_id],
    );
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("1. Monetization depends on ads the audience hates"));
    assert!(!studio.paths.index_path.exists());
}
