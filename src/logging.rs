//! Tracing subscriber setup.
//!
//! Library code only emits `tracing` events; hosts that want them printed call
//! [`init`] once at startup. `RUST_LOG`, when set, takes precedence over the
//! configured level.

use crate::config::{ConfigError, ConfigResult, LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber according to `config`.
pub fn init(config: &LoggingConfig) -> ConfigResult<()> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    result.map_err(|e| ConfigError::LoggingInit(e.to_string()))
}

fn build_filter(config: &LoggingConfig) -> ConfigResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| ConfigError::validation("logging.level", e.to_string()))
}
