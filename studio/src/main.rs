//! Studio run-lifecycle CLI.
//!
//! Prepares debate runs under `output/<phase>/`, finalizes them once their
//! artifacts are in place, reclaims old runs and keeps `output/index.md`
//! current. The studio root is `STUDIO_ROOT` or the current directory.

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use studio::cleanup::{
    CLEANUP_DRY_RUN_ENV, SKIP_CLEANUP_ENV, cleanup_runs, env_flag, render_report,
};
use studio::core::types::{Phase, RunStatus, Verdict};
use studio::error::StudioError;
use studio::exit_codes;
use studio::finalize::{FinalizeOptions, FinalizeOutcome, finalize_run, render_blocked};
use studio::io::paths::StudioPaths;
use studio::logging;
use studio::prepare::{PrepareOptions, prepare_run};
use studio::rerun::{NO_REJECTION_MESSAGE, find_rerun_context};
use studio::validate::{render_validation, validate_run};

#[derive(Parser)]
#[command(
    name = "studio",
    version,
    about = "Run-lifecycle engine for Studio debate runs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new run directory, record and instructions.
    Prepare(PrepareArgs),
    /// Validate artifacts and move a run to a terminal status.
    Finalize(FinalizeArgs),
    /// Enforce the age and size budgets on existing runs.
    Cleanup {
        /// Report what would be deleted without removing files.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the artifact checklist for a run. Read-only.
    Validate(RunArgs),
    /// Print rerun guidance from the latest rejected contrarian round.
    Rerun {
        #[command(flatten)]
        run: RunArgs,
        /// Studio phase only: restrict the search to one role.
        #[arg(long)]
        role: Option<String>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Phase the run belongs to.
    #[arg(long)]
    phase: Phase,
    /// Run identifier created by `prepare`.
    #[arg(long)]
    run_id: String,
}

#[derive(Args)]
struct PrepareArgs {
    /// Studio phase to run.
    #[arg(long)]
    phase: Phase,
    /// Idea or objective text that seeds the run.
    #[arg(long)]
    text: String,
    /// Iteration budget for the advocate/contrarian loop.
    #[arg(long)]
    max_iterations: Option<u32>,
    /// Scope configuration file (defaults to `.studio/scopes.toml` if present).
    #[arg(long)]
    scope_config: Option<PathBuf>,
    /// Accept a budget smaller than the number of scopes.
    #[arg(long)]
    allow_under_allocation: bool,
    /// Studio phase only: role pack to load (defaults to the manifest setting).
    #[arg(long)]
    role_pack: Option<String>,
    /// Studio phase only: role overrides like `+qa` or `-marketing`.
    #[arg(long, num_args = 1.., allow_hyphen_values = true)]
    roles: Vec<String>,
    /// Studio phase only: budget cap label.
    #[arg(long)]
    budget: Option<String>,
    /// Skip the cleanup pass that runs before the new run is created.
    #[arg(long)]
    skip_cleanup: bool,
    /// Preview cleanup deletions without removing files.
    #[arg(long)]
    cleanup_dry_run: bool,
}

#[derive(Args)]
struct FinalizeArgs {
    #[command(flatten)]
    run: RunArgs,
    /// Terminal status: COMPLETED, ABANDONED or FAILED.
    #[arg(long, default_value = "COMPLETED")]
    status: RunStatus,
    /// Final verdict: APPROVED, REJECTED or N/A.
    #[arg(long)]
    verdict: Option<Verdict>,
    /// Iterations executed (defaults to the count observed on disk).
    #[arg(long)]
    iterations_run: Option<u32>,
    /// Hours spent on the run.
    #[arg(long)]
    hours: Option<f64>,
    /// Cost in USD attributed to the run.
    #[arg(long)]
    cost: Option<f64>,
    /// Summary file relative to the run directory.
    #[arg(long)]
    summary: Option<String>,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            exit_code_for(&err)
        }
    };
    process::exit(code);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<StudioError>() {
        Some(StudioError::Collision { .. }) => exit_codes::COLLISION,
        _ => exit_codes::INVALID,
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let paths = StudioPaths::from_env()?;
    match cli.command {
        Command::Prepare(args) => cmd_prepare(&paths, args),
        Command::Finalize(args) => cmd_finalize(&paths, args),
        Command::Cleanup { dry_run } => cmd_cleanup(&paths, dry_run),
        Command::Validate(args) => cmd_validate(&paths, &args),
        Command::Rerun { run, role } => cmd_rerun(&paths, &run, role.as_deref()),
    }
}

fn cmd_prepare(paths: &StudioPaths, args: PrepareArgs) -> Result<i32> {
    let options = PrepareOptions {
        text: args.text,
        max_iterations: args.max_iterations,
        scope_config: args.scope_config,
        allow_under_allocation: args.allow_under_allocation,
        role_pack: args.role_pack,
        role_overrides: args.roles,
        budget: args.budget,
        skip_cleanup: args.skip_cleanup || env_flag(SKIP_CLEANUP_ENV),
        cleanup_dry_run: args.cleanup_dry_run || env_flag(CLEANUP_DRY_RUN_ENV),
    };
    let outcome = prepare_run(paths, args.phase, &options, Utc::now())?;
    if let Some(report) = &outcome.cleanup {
        println!("{}", render_report(report));
    }
    println!("Prepared {} ({})", outcome.record.run_id, outcome.record.phase);
    println!("- Run directory: {}", outcome.run_dir.display());
    println!("- Instructions: {}", outcome.instructions_path.display());
    Ok(exit_codes::OK)
}

fn cmd_finalize(paths: &StudioPaths, args: FinalizeArgs) -> Result<i32> {
    let options = FinalizeOptions {
        run_id: args.run.run_id,
        status: args.status,
        verdict: args.verdict,
        iterations_run: args.iterations_run,
        hours: args.hours,
        cost: args.cost,
        summary: args.summary,
    };
    match finalize_run(paths, args.run.phase, &options, Utc::now())? {
        FinalizeOutcome::Finalized(record) => {
            println!(
                "Finalized {} ({}) → {}",
                record.run_id, record.phase, record.status
            );
            Ok(exit_codes::OK)
        }
        FinalizeOutcome::Blocked(result) => {
            println!("{}", render_blocked(&options.run_id, &result));
            Ok(exit_codes::VALIDATION_FAILED)
        }
    }
}

fn cmd_cleanup(paths: &StudioPaths, dry_run: bool) -> Result<i32> {
    let dry_run = dry_run || env_flag(CLEANUP_DRY_RUN_ENV);
    // Cleanup is best-effort: a failed pass is reported, never fatal.
    match cleanup_runs(paths, Utc::now(), dry_run) {
        Ok(report) => println!("{}", render_report(&report)),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "cleanup failed");
            println!("Cleanup: failed");
            println!("- Cleanup warning: {err:#}");
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_validate(paths: &StudioPaths, args: &RunArgs) -> Result<i32> {
    let outcome = validate_run(paths, args.phase, &args.run_id)?;
    println!("{}", render_validation(&outcome));
    Ok(exit_codes::OK)
}

fn cmd_rerun(paths: &StudioPaths, args: &RunArgs, role: Option<&str>) -> Result<i32> {
    match find_rerun_context(paths, args.phase, &args.run_id, role)? {
        Some(context) => println!("{}", context.render()),
        None => println!("{NO_REJECTION_MESSAGE}"),
    }
    Ok(exit_codes::OK)
}
