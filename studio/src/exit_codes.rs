//! Stable exit codes for studio CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid input or configuration, unknown run, or I/O failure.
pub const INVALID: i32 = 1;
/// `studio prepare` hit an existing run directory; retry in the next second.
pub const COLLISION: i32 = 2;
/// `studio finalize` refused `COMPLETED` because required artifacts are missing.
pub const VALIDATION_FAILED: i32 = 3;
