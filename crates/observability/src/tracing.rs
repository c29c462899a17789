//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize tracing with the standard pipeline defaults.
///
/// Safe to call multiple times (subsequent calls are no-ops), so workers,
/// embedding processes and tests can all call it unconditionally.
pub fn init() {
    init_with_default("info");
}

/// Initialize tracing with an explicit fallback directive.
///
/// `RUST_LOG` always wins when set; `default_directive` applies otherwise
/// (e.g. `"warn"` in benchmarks, `"stockflow_infra=debug"` when chasing a
/// parked order).
pub fn init_with_default(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
