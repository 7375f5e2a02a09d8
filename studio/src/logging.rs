//! Diagnostic logging for the `studio` binary.
//!
//! Log events go to stderr and are filtered by `RUST_LOG`. Everything an
//! operator acts on (run ids, cleanup reports, checklists, rerun guidance) is
//! printed to stdout or written under the studio root, and does not depend on
//! the log level.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Without `RUST_LOG` only warnings are shown,
/// e.g. a cleanup pass that failed during `prepare`; `RUST_LOG=studio=debug`
/// adds retention plans and per-run eviction events.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
