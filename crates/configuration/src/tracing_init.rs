use crate::error::ConfigError;
use crate::settings::LoggingConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global `tracing` subscriber from `LoggingConfig`.
///
/// Mirrors `main.rs`'s call to `configuration::init_tracing(&config.logging)`
/// before anything else in the binary runs. File logging is intentionally not
/// wired to a rolling appender here — log formatting/transport is out of
/// scope per spec §1; this crate's job stops at installing a filtered
/// stdout subscriber so every other crate's `tracing::info!`/`debug!`/`warn!`
/// calls have somewhere to go.
pub fn init_tracing(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_new(&logging.level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| ConfigError::validation(format!("invalid log level '{}': {e}", logging.level)))?;

    fmt().with_env_filter(filter).try_init().ok();

    Ok(())
}
