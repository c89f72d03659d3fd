use crate::error::ConfigError;
use crate::settings::AppSettings;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;
pub mod tracing_init;

// Re-export the core types to provide a clean public API.
pub use settings::{AppSettings, LoggingConfig, SchedulerConfig};
pub use tracing_init::init_tracing;

/// Loads the application configuration, layering `config.toml` with
/// `APP_`-prefixed environment variable overrides.
///
/// `path` defaults to `"config.toml"` when `None` — following the same
/// optional-override shape `database::connection::connect` uses for
/// `DATABASE_URL`.
pub fn load_config(path: Option<&str>) -> Result<AppSettings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(path.unwrap_or("config.toml")).required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?;

    let settings = builder.try_deserialize::<AppSettings>()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_config_falls_back_to_defaults_when_no_file_or_env_is_present() {
        let settings = load_config(Some("this-file-does-not-exist.toml")).unwrap();
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.scheduler.tick_interval.as_secs(), 10);
        assert!(settings.database_url.is_none());
    }
}
