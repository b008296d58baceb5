//! Client-facing error types.
//!
//! Post-open native failures are not listed here: they surface as the reason
//! of a `Closed` event (see [`PortError`]).

use crate::port::PortError;
use thiserror::Error;

/// Why an open request produced `OpenFailed`.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The request was malformed and never reached the native layer.
    #[error("Invalid port configuration: {0}")]
    InvalidConfig(String),

    /// The native layer could not acquire the device.
    #[error("Failed to open serial port: {0}")]
    Native(#[from] PortError),
}

/// A command could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The operator has left the `Open` state; its handle is or will be released.
    #[error("Port is closed")]
    PortClosed,

    /// The manager task is no longer running.
    #[error("Port manager has stopped")]
    ManagerStopped,
}
