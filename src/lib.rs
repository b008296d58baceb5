//! Serial Operator Library
//!
//! Actor-style access to serial ports: a manager opens ports on request and
//! hands each one to its own operator, which owns the device exclusively and
//! reports everything it does as typed events.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `state`: Port configuration and operator lifecycle states
//! - `error`: Open and command errors
//! - `port`: Native serial layer (real devices and an in-memory mock)
//! - `protocol`: Commands and events exchanged with the manager and operators
//! - `operator`: Per-port actor
//! - `manager`: Opens ports and spawns operators
//! - `logging`: Tracing subscriber setup
//!
//! # Example
//!
//! ```rust,no_run
//! use serial_operator::{event_channel, OperatorConfig, PortConfig, PortEvent, PortManager};
//!
//! # async fn run() {
//! let manager = PortManager::system(OperatorConfig::default()).spawn();
//! let (events, mut rx) = event_channel(64);
//! manager.open(PortConfig::new("/dev/ttyUSB0", 115200), events).await.ok();
//!
//! while let Some(event) = rx.recv().await {
//!     match event {
//!         PortEvent::Opened { operator, .. } => {
//!             operator.write_acked(b"AT\r\n".to_vec()).await.ok();
//!         }
//!         PortEvent::Received { data } => println!("{:?}", data),
//!         other if other.is_terminal() => break,
//!         _ => {}
//!     }
//! }
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod operator;
pub mod port;
pub mod protocol;
pub mod state;

// Re-export commonly used types for convenience
pub use error::{CommandError, OpenError};
pub use manager::{ManagerRef, PortManager};
pub use operator::{MetricsSnapshot, Operator, OperatorRef};
pub use port::{MockDriver, MockSerialPort, PortError, SerialDriver, SystemDriver};
pub use protocol::{
    event_channel, EventReceiver, EventSender, ManagerCommand, OperatorCommand, PortEvent,
};
pub use state::{OperatorState, Parity, PortConfig};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult, OperatorConfig};
