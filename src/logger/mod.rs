//! Logging initialization.
//!
//! Thin wrapper around `tracing-subscriber` with env-filter support.
//! The configured level acts as the default; `RUST_LOG` overrides it.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// # Arguments
/// * `level` - Default log level directive, e.g. "info" or "gympulse=debug"
pub fn init(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("invalid log filter directive")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logger: {e}"))?;

    Ok(())
}
