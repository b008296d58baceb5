//! Port manager: turns open requests into running operators.
//!
//! The manager validates a request, opens the device on the blocking pool and
//! hands the result to a new operator. It keeps no table of open ports; each
//! operator owns its port outright and the manager never hears from it again.

use crate::config::OperatorConfig;
use crate::error::{CommandError, OpenError};
use crate::operator::Operator;
use crate::port::{NativeHandle, OpenedPort, PortError, SerialDriver, SystemDriver};
use crate::protocol::{event_channel, EventReceiver, EventSender, ManagerCommand, PortEvent};
use crate::state::PortConfig;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};

#[derive(Clone)]
pub struct PortManager {
    driver: Arc<dyn SerialDriver>,
    settings: OperatorConfig,
}

impl PortManager {
    pub fn new(driver: Arc<dyn SerialDriver>, settings: OperatorConfig) -> Self {
        Self { driver, settings }
    }

    /// Manager backed by the host's serial devices.
    pub fn system(settings: OperatorConfig) -> Self {
        let driver = SystemDriver::new(settings.read_poll_timeout());
        Self::new(Arc::new(driver), settings)
    }

    pub fn settings(&self) -> &OperatorConfig {
        &self.settings
    }

    /// A requester's event channel sized by `event_capacity`.
    pub fn event_channel(&self) -> (EventSender, EventReceiver) {
        event_channel(self.settings.event_capacity)
    }

    /// Handle one `Open` request.
    ///
    /// Exactly one of `Opened` or `OpenFailed` is delivered to `reply_to`.
    /// An invalid config is refused before the driver is touched.
    pub async fn open(&self, config: PortConfig, reply_to: EventSender) {
        let span = info_span!("open", port = %config.port);
        self.open_inner(config, reply_to).instrument(span).await
    }

    async fn open_inner(&self, config: PortConfig, reply_to: EventSender) {
        if let Err(reason) = config.validate() {
            warn!("Refusing to open {}: {}", config.port, reason);
            report_failure(&reply_to, OpenError::InvalidConfig(reason), config).await;
            return;
        }

        debug!("Opening {}", config);
        let driver = Arc::clone(&self.driver);
        let requested = config.clone();
        let opened = match tokio::task::spawn_blocking(move || driver.open(&requested)).await {
            Ok(result) => result,
            Err(e) => Err(PortError::other(format!("open task failed: {e}"))),
        };

        match opened {
            Ok(OpenedPort { port, applied }) => {
                if applied != config {
                    info!("{} requested, device applied {}", config, applied);
                }
                // The requester receives its reference in `Opened`.
                Operator::spawn(
                    NativeHandle::new(port),
                    applied,
                    reply_to,
                    self.settings.clone(),
                );
            }
            Err(e) => {
                warn!("Failed to open {}: {}", config.port, e);
                report_failure(&reply_to, OpenError::Native(e), config).await;
            }
        }
    }

    /// Run the manager as an actor.
    ///
    /// Each `Open` is served on its own task, so a slow device never delays
    /// requests for other ports. The actor stops once every `ManagerRef` is
    /// dropped; operators already running are unaffected.
    pub fn spawn(self) -> ManagerRef {
        let (tx, mut rx) = mpsc::channel(self.settings.command_capacity.max(1));

        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    ManagerCommand::Open { config, reply_to } => {
                        let manager = self.clone();
                        tokio::spawn(async move { manager.open(config, reply_to).await });
                    }
                }
            }
            debug!("Port manager stopped");
        });

        ManagerRef { commands: tx }
    }
}

impl std::fmt::Debug for PortManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortManager")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

async fn report_failure(reply_to: &EventSender, reason: OpenError, config: PortConfig) {
    if reply_to
        .send(PortEvent::OpenFailed { reason, config })
        .await
        .is_err()
    {
        debug!("Requester went away before OpenFailed was delivered");
    }
}

/// Handle to a spawned `PortManager`.
#[derive(Debug, Clone)]
pub struct ManagerRef {
    commands: mpsc::Sender<ManagerCommand>,
}

impl ManagerRef {
    pub async fn send(&self, command: ManagerCommand) -> Result<(), CommandError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CommandError::ManagerStopped)
    }

    /// Ask for `config` to be opened; the outcome arrives on `reply_to`.
    pub async fn open(&self, config: PortConfig, reply_to: EventSender) -> Result<(), CommandError> {
        self.send(ManagerCommand::Open { config, reply_to }).await
    }
}
