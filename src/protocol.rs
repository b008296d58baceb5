//! Typed messages exchanged between clients, the manager and operators.
//!
//! ```text
//! client ──Open──> PortManager ──native open──> Operator
//! client <──Opened / OpenFailed────────────────────┘
//! client ──Write / Close──> Operator ──Received / Wrote / Closed──> client
//! ```

use crate::error::OpenError;
use crate::operator::OperatorRef;
use crate::port::PortError;
use crate::state::PortConfig;
use tokio::sync::mpsc;

/// The sink a requester gives the manager; every event for the port goes here.
pub type EventSender = mpsc::Sender<PortEvent>;
pub type EventReceiver = mpsc::Receiver<PortEvent>;

/// Requests handled by the manager.
#[derive(Debug)]
pub enum ManagerCommand {
    /// Open a port and report the outcome to `reply_to`.
    Open {
        config: PortConfig,
        reply_to: EventSender,
    },
}

/// Requests handled by an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Queue bytes for transmission. With `ack`, a `Wrote` follows once the
    /// device has accepted them for transmission (not once the peer received them).
    Write { data: Vec<u8>, ack: bool },
    /// Drain queued writes, release the port, then report `Closed`.
    Close,
}

/// Notifications delivered to the party that opened the port.
#[derive(Debug)]
pub enum PortEvent {
    /// The port is open with the settings the device applied.
    Opened {
        config: PortConfig,
        operator: OperatorRef,
    },
    /// The port could not be opened; `config` is the request as issued.
    OpenFailed { reason: OpenError, config: PortConfig },
    /// Bytes read from the device, in device order.
    Received { data: Vec<u8> },
    /// An acknowledged write was accepted for transmission.
    Wrote { data: Vec<u8> },
    /// Terminal event. `None` for a requested close, `Some` for a device failure.
    Closed { reason: Option<PortError> },
}

impl PortEvent {
    /// Short variant name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Opened { .. } => "opened",
            Self::OpenFailed { .. } => "open_failed",
            Self::Received { .. } => "received",
            Self::Wrote { .. } => "wrote",
            Self::Closed { .. } => "closed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::OpenFailed { .. } | Self::Closed { .. })
    }
}

/// Create an event channel for a requester.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(capacity.max(1))
}
