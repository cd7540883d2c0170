#![forbid(unsafe_code)]

//! Subscriber setup for apps and tests that want lifebind's events printed.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! the application's call. This helper exists for quick setups.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "LIFEBIND_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";

/// Install a global fmt subscriber filtered by `LIFEBIND_LOG` (default `warn`).
///
/// Returns `false` if a global subscriber was already set.
pub fn init() -> bool {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
