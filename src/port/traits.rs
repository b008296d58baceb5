//! Core traits for the native serial layer.
//!
//! `SerialDriver` opens devices and `NativePort` performs raw byte transfer.
//! Both real serial ports and the in-memory mock implement them, so the
//! operator and manager never depend on a concrete backend.

use super::error::PortError;
use crate::state::{Parity, PortConfig};

/// Raw byte transfer on one open device.
///
/// A port is shared between exactly one reader thread and the operator's
/// write path, so every method takes `&self`. Implementations must tolerate
/// one concurrent `read` alongside one `write`.
pub trait NativePort: Send + Sync + std::fmt::Debug {
    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Block until bytes arrive and copy them into `buffer`.
    ///
    /// `Ok(0)` means end of stream.
    fn read(&self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Hand bytes to the device for transmission.
    ///
    /// Returns the number of bytes accepted, which may be fewer than `data.len()`.
    fn write(&self, data: &[u8]) -> Result<usize, PortError>;

    /// Release the device.
    ///
    /// Must be idempotent, and must make a blocked `read` or `write` return
    /// promptly with an error.
    fn close(&self);
}

/// A device freshly opened by a `SerialDriver`.
#[derive(Debug)]
pub struct OpenedPort {
    pub port: Box<dyn NativePort>,
    /// Settings the device actually applied, which may differ from the request.
    pub applied: PortConfig,
}

/// Entry point of the native layer.
#[cfg_attr(test, mockall::automock)]
pub trait SerialDriver: Send + Sync {
    /// Open and configure a device. May block.
    fn open(&self, config: &PortConfig) -> Result<OpenedPort, PortError>;
}

/// Map a character size onto the serialport enum.
pub fn data_bits_for(character_size: u8) -> Result<serialport::DataBits, PortError> {
    match character_size {
        5 => Ok(serialport::DataBits::Five),
        6 => Ok(serialport::DataBits::Six),
        7 => Ok(serialport::DataBits::Seven),
        8 => Ok(serialport::DataBits::Eight),
        other => Err(PortError::config(format!(
            "unsupported character size {other}"
        ))),
    }
}

pub fn character_size_of(bits: serialport::DataBits) -> u8 {
    match bits {
        serialport::DataBits::Five => 5,
        serialport::DataBits::Six => 6,
        serialport::DataBits::Seven => 7,
        serialport::DataBits::Eight => 8,
    }
}

/// Map parity onto the serialport enum. Mark and space have no counterpart there.
pub fn parity_for(parity: Parity) -> Result<serialport::Parity, PortError> {
    match parity {
        Parity::None => Ok(serialport::Parity::None),
        Parity::Odd => Ok(serialport::Parity::Odd),
        Parity::Even => Ok(serialport::Parity::Even),
        Parity::Mark | Parity::Space => Err(PortError::config(format!(
            "{parity:?} parity is not supported by this driver"
        ))),
    }
}

pub fn parity_of(parity: serialport::Parity) -> Parity {
    match parity {
        serialport::Parity::None => Parity::None,
        serialport::Parity::Odd => Parity::Odd,
        serialport::Parity::Even => Parity::Even,
    }
}

pub fn stop_bits_for(two_stop_bits: bool) -> serialport::StopBits {
    if two_stop_bits {
        serialport::StopBits::Two
    } else {
        serialport::StopBits::One
    }
}
