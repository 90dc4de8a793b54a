//! Tracing subscriber setup.

use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` when the variable is unset or invalid.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(default_directive: &str) -> bool {
    let from_env = EnvFilter::try_from_default_env().ok();
    let env_set = from_env.is_some();
    let filter = from_env.unwrap_or_else(|| EnvFilter::new(default_directive));

    match tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        Ok(()) => {
            debug!(default_directive, from_env = env_set, "Tracing initialized");
            true
        }
        Err(e) => {
            warn!(error = %e, "Tracing subscriber already installed");
            false
        }
    }
}
