//! Configuration schema definitions.
//!
//! These settings tune the runtime (buffers, channel sizes, timeouts,
//! logging). Line settings for a port are never configured here; they travel
//! with each open request as a `PortConfig`.

use super::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;
pub const DEFAULT_COMMAND_CAPACITY: usize = 64;
pub const DEFAULT_EVENT_CAPACITY: usize = 256;
pub const DEFAULT_READ_POLL_TIMEOUT_MS: u64 = 100;
pub const DEFAULT_CLOSE_DRAIN_TIMEOUT_MS: u64 = 2000;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-port operator tuning
    pub operator: OperatorConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    pub fn validate(&self) -> ConfigResult<()> {
        self.operator.validate()
    }
}

/// Operator configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Size of the buffer handed to each native read
    pub read_buffer_size: usize,
    /// Commands an operator buffers before `write` waits
    pub command_capacity: usize,
    /// Suggested capacity for event channels created by clients
    pub event_capacity: usize,
    /// How often the system driver re-checks for a close while blocked
    pub read_poll_timeout_ms: u64,
    /// How long a requested close waits for queued writes
    pub close_drain_timeout_ms: u64,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            read_poll_timeout_ms: DEFAULT_READ_POLL_TIMEOUT_MS,
            close_drain_timeout_ms: DEFAULT_CLOSE_DRAIN_TIMEOUT_MS,
        }
    }
}

impl OperatorConfig {
    pub fn read_poll_timeout(&self) -> Duration {
        Duration::from_millis(self.read_poll_timeout_ms)
    }

    pub fn close_drain_timeout(&self) -> Duration {
        Duration::from_millis(self.close_drain_timeout_ms)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.read_buffer_size == 0 {
            return Err(ConfigError::validation(
                "operator.read_buffer_size",
                "must be greater than zero",
            ));
        }
        if self.command_capacity == 0 {
            return Err(ConfigError::validation(
                "operator.command_capacity",
                "must be greater than zero",
            ));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::validation(
                "operator.event_capacity",
                "must be greater than zero",
            ));
        }
        if self.read_poll_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "operator.read_poll_timeout_ms",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}
