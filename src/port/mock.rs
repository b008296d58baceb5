//! Mock serial driver for testing.
//!
//! `MockDriver` opens in-memory `MockSerialPort`s that behave like a real
//! device without requiring hardware: reads block until a test injects data,
//! an error or end of stream, and every native write is logged.

use super::error::PortError;
use super::traits::{NativePort, OpenedPort, SerialDriver};
use crate::state::PortConfig;
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Something a blocked `read` can wake up to.
#[derive(Debug)]
enum ReadScript {
    Chunk(Vec<u8>),
    Error(PortError),
    Eof,
}

/// Inner state of the mock port, protected by a mutex for interior mutability.
#[derive(Debug, Default)]
struct MockPortState {
    /// Scripted results for read operations, consumed in order.
    reads: VecDeque<ReadScript>,
    /// Log of every native write call.
    write_log: Vec<Vec<u8>>,
    /// Error returned by the next write call.
    write_error: Option<PortError>,
    /// While set, writes block until released or closed.
    writes_blocked: bool,
    /// Upper bound on bytes accepted per write call.
    max_write_chunk: Option<usize>,
    closed: bool,
    close_count: usize,
    read_calls: usize,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<MockPortState>,
    changed: Condvar,
}

/// Mock serial port implementation for testing.
///
/// Clones share state, so a test keeps one clone while the operator owns another.
///
/// # Example
/// ```
/// use serial_operator::port::{MockSerialPort, NativePort};
///
/// let port = MockSerialPort::new("MOCK0");
/// port.inject_read(b"Hello");
///
/// let mut buffer = [0u8; 16];
/// let n = port.read(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"Hello");
///
/// port.write(b"Response").unwrap();
/// assert_eq!(port.write_log(), vec![b"Response".to_vec()]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    name: String,
    shared: Arc<Shared>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared: Arc::new(Shared::default()),
        }
    }

    fn script(&self, entry: ReadScript) {
        let mut state = self.shared.state.lock();
        state.reads.push_back(entry);
        self.shared.changed.notify_all();
    }

    /// Deliver one chunk to the reader. Each chunk comes back from a single read.
    pub fn inject_read(&self, data: &[u8]) {
        self.script(ReadScript::Chunk(data.to_vec()));
    }

    /// Make the next read fail.
    pub fn inject_read_error(&self, error: PortError) {
        self.script(ReadScript::Error(error));
    }

    /// Make the next read report end of stream.
    pub fn inject_eof(&self) {
        self.script(ReadScript::Eof);
    }

    /// Make the next write fail.
    pub fn fail_next_write(&self, error: PortError) {
        self.shared.state.lock().write_error = Some(error);
    }

    /// Hold every write until `release_writes` or `close`.
    pub fn block_writes(&self) {
        self.shared.state.lock().writes_blocked = true;
    }

    pub fn release_writes(&self) {
        let mut state = self.shared.state.lock();
        state.writes_blocked = false;
        self.shared.changed.notify_all();
    }

    pub fn set_max_write_chunk(&self, chunk: Option<usize>) {
        self.shared.state.lock().max_write_chunk = chunk;
    }

    /// Get a copy of the data passed to each native write call.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.shared.state.lock().write_log.clone()
    }

    /// All bytes accepted so far, concatenated.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.shared.state.lock().write_log.concat()
    }

    pub fn close_count(&self) -> usize {
        self.shared.state.lock().close_count
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Number of read calls that have started.
    pub fn read_calls(&self) -> usize {
        self.shared.state.lock().read_calls
    }
}

impl NativePort for MockSerialPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.shared.state.lock();
        state.read_calls += 1;

        loop {
            if state.closed {
                return Err(PortError::Closed);
            }
            match state.reads.pop_front() {
                Some(ReadScript::Chunk(mut chunk)) => {
                    let n = chunk.len().min(buffer.len());
                    buffer[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        // Keep the remainder for the next read
                        state.reads.push_front(ReadScript::Chunk(chunk.split_off(n)));
                    }
                    return Ok(n);
                }
                Some(ReadScript::Error(error)) => return Err(error),
                Some(ReadScript::Eof) => return Ok(0),
                None => self.shared.changed.wait(&mut state),
            }
        }
    }

    fn write(&self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.shared.state.lock();

        while state.writes_blocked && !state.closed {
            self.shared.changed.wait(&mut state);
        }
        if state.closed {
            return Err(PortError::Closed);
        }
        if let Some(error) = state.write_error.take() {
            return Err(error);
        }

        let n = state
            .max_write_chunk
            .map_or(data.len(), |chunk| chunk.min(data.len()));
        state.write_log.push(data[..n].to_vec());
        Ok(n)
    }

    fn close(&self) {
        let mut state = self.shared.state.lock();
        state.close_count += 1;
        state.closed = true;
        self.shared.changed.notify_all();
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

type RejectRule = dyn Fn(&PortConfig) -> Option<PortError> + Send + Sync;
type ApplyRule = dyn Fn(&PortConfig) -> PortConfig + Send + Sync;

#[derive(Default)]
struct DriverState {
    /// Every port ever opened, latest last, keyed by path.
    opened: HashMap<String, Vec<MockSerialPort>>,
    open_calls: usize,
}

/// Driver that hands out `MockSerialPort`s.
///
/// By default every well-formed request succeeds and the applied settings
/// equal the requested ones.
#[derive(Clone)]
pub struct MockDriver {
    state: Arc<Mutex<DriverState>>,
    reject: Arc<Mutex<Option<Arc<RejectRule>>>>,
    apply: Arc<Mutex<Option<Arc<ApplyRule>>>>,
    exclusive: bool,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DriverState::default())),
            reject: Arc::new(Mutex::new(None)),
            apply: Arc::new(Mutex::new(None)),
            exclusive: false,
        }
    }

    /// Refuse a second open of a path whose previous port is still open.
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Refuse opens for which `rule` returns an error.
    pub fn reject_when<F>(&self, rule: F)
    where
        F: Fn(&PortConfig) -> Option<PortError> + Send + Sync + 'static,
    {
        *self.reject.lock() = Some(Arc::new(rule));
    }

    /// Report `rule(request)` as the applied settings.
    pub fn apply_with<F>(&self, rule: F)
    where
        F: Fn(&PortConfig) -> PortConfig + Send + Sync + 'static,
    {
        *self.apply.lock() = Some(Arc::new(rule));
    }

    /// The most recently opened port for `path`.
    pub fn port(&self, path: &str) -> Option<MockSerialPort> {
        self.state
            .lock()
            .opened
            .get(path)
            .and_then(|ports| ports.last().cloned())
    }

    /// Number of times the native open primitive was called.
    pub fn open_calls(&self) -> usize {
        self.state.lock().open_calls
    }

    /// Number of ports opened and not yet closed.
    pub fn live_ports(&self) -> usize {
        self.state
            .lock()
            .opened
            .values()
            .flatten()
            .filter(|port| !port.is_closed())
            .count()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialDriver for MockDriver {
    fn open(&self, config: &PortConfig) -> Result<OpenedPort, PortError> {
        let reject = self.reject.lock().clone();
        let apply = self.apply.lock().clone();

        let mut state = self.state.lock();
        state.open_calls += 1;

        if let Some(error) = reject.and_then(|rule| rule(config)) {
            return Err(error);
        }
        if self.exclusive {
            let in_use = state
                .opened
                .get(&config.port)
                .is_some_and(|ports| ports.iter().any(|port| !port.is_closed()));
            if in_use {
                return Err(PortError::busy(config.port.clone()));
            }
        }

        let port = MockSerialPort::new(config.port.clone());
        state
            .opened
            .entry(config.port.clone())
            .or_default()
            .push(port.clone());

        let applied = apply.map_or_else(|| config.clone(), |rule| rule(config));
        Ok(OpenedPort {
            port: Box::new(port),
            applied,
        })
    }
}

impl std::fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDriver")
            .field("open_calls", &self.open_calls())
            .field("exclusive", &self.exclusive)
            .finish()
    }
}
