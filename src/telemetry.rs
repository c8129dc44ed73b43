//! Structured logging setup.
//!
//! One call, made once at process start: an env-filter driven
//! `tracing-subscriber` so operators control verbosity with `RUST_LOG`
//! without the binary needing its own flag for it.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Falls back to `info` level
/// when `RUST_LOG` is unset or unparsable.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
