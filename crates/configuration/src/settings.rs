use serde::Deserialize;
use std::time::Duration;

/// The root application configuration — the ambient, non-experiment-specific
/// settings the binary needs before any `Experiment` is loaded. Per-run
/// parameters (strategies, capital, wallet) live on `core_types::Experiment`
/// instead; this struct is the `config.toml` counterpart the teacher's
/// `Config` played for risk/strategy parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub database_url: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            scheduler: SchedulerConfig::default(),
            database_url: None,
        }
    }
}

/// Logging configuration, mirroring the fields `main.rs` reads off
/// `config.logging` before calling `init_tracing`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file_logging: bool,
    #[serde(default = "default_log_dir")]
    pub directory: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_logging: false,
            directory: default_log_dir(),
        }
    }
}

/// Scheduler-wide timing parameters (spec §4.7, §5).
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_seconds", with = "duration_secs")]
    pub tick_interval: Duration,
    #[serde(default = "default_sync_timeout_seconds", with = "duration_secs")]
    pub holding_sync_timeout: Duration,
    #[serde(default = "default_sync_retries")]
    pub holding_sync_retries: u32,
    #[serde(default = "default_price_timeout_seconds", with = "duration_secs")]
    pub price_fetch_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(default_tick_seconds()),
            holding_sync_timeout: Duration::from_secs(default_sync_timeout_seconds()),
            holding_sync_retries: default_sync_retries(),
            price_fetch_timeout: Duration::from_secs(default_price_timeout_seconds()),
        }
    }
}

fn default_tick_seconds() -> u64 {
    10
}

fn default_sync_timeout_seconds() -> u64 {
    30
}

fn default_sync_retries() -> u32 {
    3
}

fn default_price_timeout_seconds() -> u64 {
    15
}

mod duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
