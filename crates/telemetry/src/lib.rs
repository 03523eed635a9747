//! Tracing subscriber bootstrap.

use anyhow::anyhow;
use bookquest_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` takes precedence over
/// `telemetry.log_filter`.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .map_err(|e| anyhow!("invalid log filter '{}': {}", settings.log_filter, e))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match settings.log_format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))?;

    tracing::debug!(target: "bookquest-telemetry", format = ?settings.log_format, "tracing initialized");
    Ok(())
}
