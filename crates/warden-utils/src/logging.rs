//! Structured logging setup shared by the CLI and by tests that want log
//! output on failure.

use tracing_subscriber::{EnvFilter, fmt};

/// Initializes a global `tracing` subscriber. `json` selects machine-readable
/// output for CI ingestion; otherwise a compact human-readable format is
/// used. The filter defaults to `info` and honors `WARDEN_LOG`.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_env("WARDEN_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt().with_env_filter(filter).with_target(false);

    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.compact().try_init();
    }
}
