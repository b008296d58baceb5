//! Shared test utilities for serial operator tests.
//!
//! This module provides common test infrastructure including:
//! - A harness wiring a `MockDriver` to a spawned manager
//! - Event assertions with timeouts
//! - Common config builders

#![allow(dead_code)]

use serial_operator::{
    EventReceiver, EventSender, ManagerRef, MockDriver, MockSerialPort,
    OperatorConfig, OperatorRef, PortConfig, PortEvent, PortManager,
};
use std::sync::Arc;
use std::time::Duration;

/// How long to wait for an event that should arrive.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to watch for an event that should not arrive.
pub const QUIET_PERIOD: Duration = Duration::from_millis(100);

/// 9600 baud, 8 data bits, no parity, one stop bit.
pub fn config_8n1(port: &str) -> PortConfig {
    PortConfig::new(port, 9600)
}

/// A manager backed by a `MockDriver`, plus one requester's event channel.
pub struct Harness {
    pub driver: MockDriver,
    pub manager: ManagerRef,
    pub events: EventReceiver,
    sender: EventSender,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(MockDriver::new(), OperatorConfig::default())
    }

    pub fn with_settings(settings: OperatorConfig) -> Self {
        Self::with(MockDriver::new(), settings)
    }

    pub fn with(driver: MockDriver, settings: OperatorConfig) -> Self {
        let manager = PortManager::new(Arc::new(driver.clone()), settings);
        let (sender, events) = manager.event_channel();
        let manager = manager.spawn();
        Self {
            driver,
            manager,
            events,
            sender,
        }
    }

    /// A sender delivering into this harness's event channel.
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    /// Request an open and return the first event it produces.
    pub async fn open(&mut self, config: PortConfig) -> PortEvent {
        self.manager
            .open(config, self.sender.clone())
            .await
            .expect("manager stopped");
        self.next_event().await
    }

    /// Open a port that is expected to succeed.
    pub async fn open_ok(&mut self, config: PortConfig) -> (OperatorRef, MockSerialPort) {
        let path = config.port.clone();
        match self.open(config).await {
            PortEvent::Opened { operator, .. } => {
                let port = self.driver.port(&path).expect("driver opened no port");
                (operator, port)
            }
            other => panic!("expected Opened, got {:?}", other),
        }
    }

    pub async fn next_event(&mut self) -> PortEvent {
        next_event(&mut self.events).await
    }

    pub async fn assert_no_event(&mut self) {
        assert_no_event(&mut self.events).await
    }
}

/// Wait for the next event, failing the test on timeout.
pub async fn next_event(events: &mut EventReceiver) -> PortEvent {
    tokio::time::timeout(EVENT_TIMEOUT, events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Fail if an event arrives within `QUIET_PERIOD`.
pub async fn assert_no_event(events: &mut EventReceiver) {
    if let Ok(Some(event)) = tokio::time::timeout(QUIET_PERIOD, events.recv()).await {
        panic!("unexpected event: {:?}", event);
    }
}

/// Poll `condition` until it holds, failing the test on timeout.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(EVENT_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
