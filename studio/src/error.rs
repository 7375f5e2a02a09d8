//! Typed failures for the run-lifecycle engine.
//!
//! Orchestration code works in `anyhow::Result`; these variants ride inside
//! `anyhow::Error` and are recovered with `downcast_ref` at the CLI boundary to
//! select an exit code. Artifact validation failures are not errors: see
//! [`crate::core::checklist::ValidationResult`].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudioError {
    /// The computed run directory already exists. Retry in the next second.
    #[error("run id collision: {run_id} already exists at {} (retry with a new timestamp)", path.display())]
    Collision { run_id: String, path: PathBuf },

    /// Run directory or record is absent, unreadable, or malformed.
    #[error("run not found: {run_id} ({reason})")]
    NotFound { run_id: String, reason: String },

    /// Invalid scope, retention, role or CLI configuration.
    #[error("invalid configuration `{field}`: {message}")]
    Config { field: String, message: String },

    /// File-system failure not covered above.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StudioError {
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        StudioError::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(run_id: impl Into<String>, reason: impl Into<String>) -> Self {
        StudioError::NotFound {
            run_id: run_id.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StudioError::Io {
            path: path.into(),
            source,
        }
    }

    /// Collisions are the only failure that succeeds on a plain retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StudioError::Collision { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let err = StudioError::config("scopes[1].weight", "must be > 0");
        assert_eq!(
            err.to_string(),
            "invalid configuration `scopes[1].weight`: must be > 0"
        );

        let err = StudioError::Collision {
            run_id: "run_market_20250101_000000".to_string(),
            path: PathBuf::from("output/market/run_market_20250101_000000"),
        };
        assert!(err.to_string().contains("retry"));
        assert!(err.is_retryable());
        assert!(!StudioError::not_found("x", "missing").is_retryable());
    }

    #[test]
    fn survives_anyhow_round_trip() {
        let err: anyhow::Error = StudioError::not_found("run_x", "missing run.json").into();
        let err = err.context("finalize run_x");
        let typed = err.downcast_ref::<StudioError>().expect("downcast");
        assert!(matches!(typed, StudioError::NotFound { .. }));
    }
}
