//! Telemetry initialization (structured logging via `tracing`).
//!
//! Log verbosity is controlled through the standard `RUST_LOG` environment
//! variable, defaulting to `info` when unset:
//!
//! ```bash
//! RUST_LOG=lbnctl=debug,sqlx=warn lbnctl -f config.yaml
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with console output.
///
/// Safe to call once per process; a second call reports the error from
/// `try_init` instead of panicking so tests sharing a process stay quiet.
pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    tracing::info!("Telemetry initialized");

    Ok(())
}
