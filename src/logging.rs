//! Tracing bootstrap for binaries and examples.

use tracing_subscriber::EnvFilter;

/// Initialize a global `tracing` subscriber.
///
/// Filter is taken from `RUST_LOG`, defaulting to `worklink=info`. Safe to
/// call more than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("worklink=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
