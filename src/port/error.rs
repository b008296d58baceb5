//! Port-specific error types.
//!
//! Every failure reported by the native layer is expressed as a `PortError`.
//! Open failures travel inside `OpenFailed`, post-open failures become the
//! reason of the single `Closed` event an operator emits.

use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// The port exists but is held by someone else.
    #[error("Serial port is busy: {0}")]
    Busy(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The native layer refused the requested line settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The device reported end of stream (typically unplugged).
    #[error("Serial port disconnected: {0}")]
    Disconnected(String),

    /// The handle has already been released.
    #[error("Port handle is closed")]
    Closed,

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Busy error from a port name.
    pub fn busy(port_name: impl Into<String>) -> Self {
        Self::Busy(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a Disconnected error from a port name.
    pub fn disconnected(port_name: impl Into<String>) -> Self {
        Self::Disconnected(port_name.into())
    }

    /// Wrap any displayable failure as an I/O error.
    pub(crate) fn other(err: impl std::fmt::Display) -> Self {
        Self::Io(std::io::Error::other(err.to_string()))
    }
}
