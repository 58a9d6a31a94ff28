//! Tracing initialization
//! Log level and output format are driven by LOG_LEVEL / LOG_FORMAT.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Initialize the global tracing subscriber.
///
/// Safe to call more than once; subsequent calls are no-ops so tests that
/// share a process do not panic.
pub fn init_tracing() {
    let config = LoggingConfig::from_env().unwrap_or(LoggingConfig {
        level: "INFO".to_string(),
        format: LogFormat::Plain,
    });

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_lowercase()));

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
        LogFormat::Plain => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber was already initialized");
    }
}
