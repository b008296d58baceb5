//! Serial port implementation over the `serialport` crate.
//!
//! The device is opened once and cloned into a read side and a write side.
//! On unix both sides wait in `poll(2)` on the tty descriptor together with a
//! wake pipe; `close` writes to the pipe, which forces a blocked read or write
//! out immediately, and the read-side descriptor is dropped before `close`
//! returns. Elsewhere the sides fall back to the port timeout and notice a
//! close once it expires.

use super::error::PortError;
use super::traits::{
    character_size_of, data_bits_for, parity_for, parity_of, stop_bits_for, NativePort,
    OpenedPort, SerialDriver,
};
use crate::state::PortConfig;
use parking_lot::Mutex;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[cfg(unix)]
type NativeSerial = serialport::TTYPort;
#[cfg(windows)]
type NativeSerial = serialport::COMPort;

/// Synchronous serial port wrapping a native `serialport` handle.
pub struct SyncSerialPort {
    /// The port name/path for identification.
    name: String,
    reader: Mutex<Option<NativeSerial>>,
    writer: Mutex<Option<NativeSerial>>,
    closed: AtomicBool,
    #[cfg(unix)]
    wake: wake::WakePipe,
}

impl SyncSerialPort {
    /// Open a serial port with the given configuration.
    ///
    /// Returns the port together with the settings read back from the device.
    ///
    /// # Example
    /// ```no_run
    /// use serial_operator::port::SyncSerialPort;
    /// use serial_operator::PortConfig;
    /// use std::time::Duration;
    ///
    /// let config = PortConfig::new("/dev/ttyUSB0", 115200);
    /// let (port, applied) = SyncSerialPort::open(&config, Duration::from_millis(100))?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(config: &PortConfig, poll_timeout: Duration) -> Result<(Self, PortConfig), PortError> {
        let port_name = config.port.as_str();
        let writer = serialport::new(port_name, config.baud)
            .data_bits(data_bits_for(config.character_size)?)
            .parity(parity_for(config.parity)?)
            .stop_bits(stop_bits_for(config.two_stop_bits))
            .flow_control(serialport::FlowControl::None)
            .timeout(poll_timeout)
            .open_native()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => PortError::not_found(port_name),
                serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
                _ => PortError::Serial(e),
            })?;

        let applied = read_back(config, &writer);
        Ok((Self::from_native(port_name, writer)?, applied))
    }

    /// Wrap an already configured native port.
    pub(crate) fn from_native(name: impl Into<String>, writer: NativeSerial) -> Result<Self, PortError> {
        let reader = writer.try_clone_native()?;
        Ok(Self {
            name: name.into(),
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            closed: AtomicBool::new(false),
            #[cfg(unix)]
            wake: wake::WakePipe::new()?,
        })
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Wait until `port` can make progress. `false` means a close woke us.
    #[cfg(unix)]
    fn ready(&self, port: &NativeSerial, interest: libc::c_short) -> Result<bool, PortError> {
        use std::os::fd::AsRawFd;
        Ok(self.wake.wait(port.as_raw_fd(), interest)?)
    }

    #[cfg(not(unix))]
    fn ready(&self, _port: &NativeSerial, _interest: i16) -> Result<bool, PortError> {
        Ok(true)
    }

    #[cfg(unix)]
    fn interrupt(&self) {
        self.wake.wake();
        // The woken reader lets go of the lock straight away.
        self.reader.lock().take();
    }

    #[cfg(not(unix))]
    fn interrupt(&self) {
        if let Some(mut reader) = self.reader.try_lock() {
            reader.take();
        }
    }
}

#[cfg(unix)]
const READABLE: libc::c_short = libc::POLLIN;
#[cfg(unix)]
const WRITABLE: libc::c_short = libc::POLLOUT;
#[cfg(not(unix))]
const READABLE: i16 = 0;
#[cfg(not(unix))]
const WRITABLE: i16 = 0;

/// Settings as reported by the device, falling back to the request where
/// the platform cannot answer.
fn read_back(requested: &PortConfig, port: &dyn serialport::SerialPort) -> PortConfig {
    PortConfig {
        port: requested.port.clone(),
        baud: port.baud_rate().unwrap_or(requested.baud),
        character_size: port
            .data_bits()
            .map(character_size_of)
            .unwrap_or(requested.character_size),
        two_stop_bits: port
            .stop_bits()
            .map(|bits| bits == serialport::StopBits::Two)
            .unwrap_or(requested.two_stop_bits),
        parity: port.parity().map(parity_of).unwrap_or(requested.parity),
    }
}

impl NativePort for SyncSerialPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut guard = self.reader.lock();
        loop {
            if self.is_closed() {
                guard.take();
                return Err(PortError::Closed);
            }
            let Some(port) = guard.as_mut() else {
                return Err(PortError::Closed);
            };
            if !self.ready(port, READABLE)? {
                continue;
            }
            match port.read(buffer) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(PortError::Io(e)),
            }
        }
    }

    fn write(&self, data: &[u8]) -> Result<usize, PortError> {
        let mut guard = self.writer.lock();
        loop {
            if self.is_closed() {
                guard.take();
                return Err(PortError::Closed);
            }
            let Some(port) = guard.as_mut() else {
                return Err(PortError::Closed);
            };
            if !self.ready(port, WRITABLE)? {
                continue;
            }
            match port.write(data) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(PortError::Io(e)),
            }
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // A write in progress drops its descriptor when it next sees the flag.
        if let Some(mut writer) = self.writer.try_lock() {
            writer.take();
        }
        self.interrupt();
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(unix)]
mod wake {
    use std::io;
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

    /// Self-pipe that turns `close` into an event `poll` can see.
    #[derive(Debug)]
    pub(super) struct WakePipe {
        read: OwnedFd,
        write: OwnedFd,
    }

    impl WakePipe {
        pub(super) fn new() -> io::Result<Self> {
            let mut fds = [0 as libc::c_int; 2];
            if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
                return Err(io::Error::last_os_error());
            }
            // SAFETY: pipe(2) just returned two descriptors nobody else owns.
            let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
            for fd in [read.as_raw_fd(), write.as_raw_fd()] {
                configure(fd)?;
            }
            Ok(Self { read, write })
        }

        /// Never drained: once woken, every later wait returns at once.
        pub(super) fn wake(&self) {
            let byte = 1u8;
            // A full pipe is already readable, so a failed write is harmless.
            let _ = unsafe {
                libc::write(
                    self.write.as_raw_fd(),
                    (&byte as *const u8).cast::<libc::c_void>(),
                    1,
                )
            };
        }

        /// Block until `fd` reports `interest` (or hangs up), or the pipe is woken.
        /// Returns `false` when woken.
        pub(super) fn wait(&self, fd: RawFd, interest: libc::c_short) -> io::Result<bool> {
            let mut fds = [
                libc::pollfd {
                    fd,
                    events: interest,
                    revents: 0,
                },
                libc::pollfd {
                    fd: self.read.as_raw_fd(),
                    events: libc::POLLIN,
                    revents: 0,
                },
            ];
            loop {
                let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
                if rc < 0 {
                    let err = io::Error::last_os_error();
                    if err.kind() == io::ErrorKind::Interrupted {
                        continue;
                    }
                    return Err(err);
                }
                if fds[1].revents != 0 {
                    return Ok(false);
                }
                if fds[0].revents != 0 {
                    return Ok(true);
                }
            }
        }
    }

    fn configure(fd: RawFd) -> io::Result<()> {
        unsafe {
            if libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) != 0 {
                return Err(io::Error::last_os_error());
            }
            let flags = libc::fcntl(fd, libc::F_GETFL);
            if flags < 0 || libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }
}

/// Driver for the operating system's serial devices.
#[derive(Debug, Clone)]
pub struct SystemDriver {
    poll_timeout: Duration,
}

impl SystemDriver {
    /// `poll_timeout` is the native port timeout. Off unix it also bounds how
    /// long a blocked read or write takes to notice a close.
    pub fn new(poll_timeout: Duration) -> Self {
        Self { poll_timeout }
    }
}

impl Default for SystemDriver {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::config::DEFAULT_READ_POLL_TIMEOUT_MS))
    }
}

impl SerialDriver for SystemDriver {
    fn open(&self, config: &PortConfig) -> Result<OpenedPort, PortError> {
        let (port, applied) = SyncSerialPort::open(config, self.poll_timeout)?;
        Ok(OpenedPort {
            port: Box::new(port),
            applied,
        })
    }
}
