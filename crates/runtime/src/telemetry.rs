//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Initialize console logging with an env-filter.
///
/// `default_level` applies when `RUST_LOG` is unset. Safe to call once per
/// process; later calls are no-ops.
pub fn init_telemetry(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
