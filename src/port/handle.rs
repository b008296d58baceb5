//! Exclusive ownership of an open native port.
//!
//! `NativeHandle` is held by exactly one operator. The reader thread only
//! ever receives a `ReadHalf`, write tasks only a `WriteHalf`, and the device
//! is closed exactly once: when the handle itself is released or dropped.

use super::error::PortError;
use super::traits::NativePort;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct NativeHandle {
    port: Arc<dyn NativePort>,
}

impl NativeHandle {
    pub fn new(port: Box<dyn NativePort>) -> Self {
        Self {
            port: Arc::from(port),
        }
    }

    pub fn name(&self) -> &str {
        self.port.name()
    }

    pub(crate) fn read_half(&self) -> ReadHalf {
        ReadHalf {
            port: Arc::clone(&self.port),
        }
    }

    pub(crate) fn write_half(&self) -> WriteHalf {
        WriteHalf {
            port: Arc::clone(&self.port),
        }
    }

    /// Close the device. Consuming `self` makes a second release impossible.
    pub fn release(self) {
        debug!("Releasing native handle for {}", self.port.name());
    }
}

impl Drop for NativeHandle {
    fn drop(&mut self) {
        self.port.close();
    }
}

/// Read access for the background reader.
#[derive(Debug)]
pub(crate) struct ReadHalf {
    port: Arc<dyn NativePort>,
}

impl ReadHalf {
    pub(crate) fn read(&self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.port.read(buffer)
    }

    pub(crate) fn name(&self) -> &str {
        self.port.name()
    }
}

/// Write access for a single in-flight write.
#[derive(Debug, Clone)]
pub(crate) struct WriteHalf {
    port: Arc<dyn NativePort>,
}

impl WriteHalf {
    /// Keep writing until the device has accepted every byte.
    pub(crate) fn write_all(&self, data: &[u8]) -> Result<(), PortError> {
        let mut offset = 0;
        while offset < data.len() {
            match self.port.write(&data[offset..])? {
                0 => {
                    return Err(PortError::Io(std::io::Error::from(
                        std::io::ErrorKind::WriteZero,
                    )))
                }
                n => offset += n,
            }
        }
        Ok(())
    }
}
