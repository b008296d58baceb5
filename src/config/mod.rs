//! Configuration module for serial-operator.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `SERIALOP_CONFIG` environment variable (explicit path)
//! 2. `./serial-operator.toml` (current directory)
//! 3. `serial-operator.toml` in the platform config directory
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Any configuration value can be overridden via environment variables.
//! The pattern is: `SERIALOP_<SECTION>_<KEY>`
//!
//! Examples:
//! - `SERIALOP_OPERATOR_READ_BUFFER_SIZE=4096`
//! - `SERIALOP_OPERATOR_CLOSE_DRAIN_TIMEOUT_MS=500`
//! - `SERIALOP_LOGGING_LEVEL=debug`
//!
//! # Example
//!
//! ```rust,no_run
//! use serial_operator::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//! println!("Read buffer: {} bytes", config.operator.read_buffer_size);
//! # Ok::<(), serial_operator::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{
    Config, LogFormat, LoggingConfig, OperatorConfig, DEFAULT_CLOSE_DRAIN_TIMEOUT_MS,
    DEFAULT_COMMAND_CAPACITY, DEFAULT_EVENT_CAPACITY, DEFAULT_READ_BUFFER_SIZE,
    DEFAULT_READ_POLL_TIMEOUT_MS,
};
