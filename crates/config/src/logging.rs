use crate::{ConfigError, LoggingSettings};
use tracing_subscriber::{fmt, EnvFilter};

/// Builds the event filter; `RUST_LOG` takes precedence over the settings.
pub fn env_filter(settings: &LoggingSettings) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(settings.level.trim()).map_err(|e| ConfigError::Invalid {
        key: "logging.level".to_string(),
        message: e.to_string(),
    })
}

/// Installs the global `tracing` subscriber, writing to stderr.
///
/// Fails when a global subscriber is already set.
pub fn init(settings: &LoggingSettings) -> Result<(), ConfigError> {
    let filter = env_filter(settings)?;
    let installed = if settings.json {
        fmt().json().with_writer(std::io::stderr).with_env_filter(filter).try_init()
    } else {
        fmt().with_writer(std::io::stderr).with_env_filter(filter).try_init()
    };
    installed.map_err(|e| ConfigError::Logging(e.to_string()))
}
