//! Tracing setup shared by the orchestrator and agent binaries.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. Reads `RUST_LOG`, defaulting to
/// `info` when unset or unparsable. Safe to call once per process; a second
/// call is a no-op (the underlying `try_init` error is ignored).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
