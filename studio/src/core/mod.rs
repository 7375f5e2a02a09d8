//! Deterministic, pure logic shared by the run-lifecycle engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures (records, listings, footprints) and return deterministic
//! outputs suitable for tests. Wall-clock time is always passed in.

pub mod checklist;
pub mod index;
pub mod record;
pub mod rejection;
pub mod retention;
pub mod run_id;
pub mod scopes;
pub mod types;
pub mod verdict;
