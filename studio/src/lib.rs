//! Run-lifecycle engine for Studio debate runs.
//!
//! A run is one advocate/contrarian debate over a seed idea, stored under
//! `output/<phase>/<run_id>/`. This crate creates runs, checks their artifacts,
//! finalizes them, reclaims old ones and keeps the run index current. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (allocation, checklists, retention
//!   planning, index rendering). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (filesystem layout, atomic writes,
//!   configuration, run registry, reclamation).
//!
//! Orchestration modules ([`prepare`], [`finalize`], [`cleanup`], [`validate`],
//! [`rerun`]) coordinate core logic with I/O to implement CLI commands.

pub mod cleanup;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod finalize;
pub mod io;
pub mod logging;
pub mod prepare;
pub mod rerun;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod validate;
