//! Logging setup.

use tracing_subscriber::EnvFilter;

/// Install a `tracing` fmt subscriber for the process.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` (usually
/// [`EngineConfig::log_filter`](crate::config::EngineConfig::log_filter)) is
/// used. Returns `false` if a global subscriber was already installed, which
/// makes repeated calls harmless.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
