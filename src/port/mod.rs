//! Native serial layer.
//!
//! Provides the traits the core consumes from the operating system, a
//! `serialport`-backed implementation, and an in-memory mock for tests.

pub mod error;
pub mod handle;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use handle::NativeHandle;
pub use mock::{MockDriver, MockSerialPort};
pub use sync_port::{SyncSerialPort, SystemDriver};
pub use traits::*;
