//! Manager open E2E tests.
//!
//! These tests verify:
//! - Config validation before any native call
//! - Driver refusals reported as `OpenFailed`
//! - Applied settings echoed in `Opened`
//! - Independent operators for concurrent opens

use crate::common::{config_8n1, next_event, Harness};
use serial_operator::{
    event_channel, MockDriver, OpenError, OperatorConfig, Parity, PortConfig, PortError,
    PortEvent,
};

#[tokio::test]
async fn test_invalid_configs_never_reach_driver() {
    let mut harness = Harness::new();

    for config in [
        PortConfig::new("", 9600),
        PortConfig::new("MOCK0", 0),
        PortConfig::new("MOCK0", 9600).with_character_size(9),
        PortConfig::new("MOCK0", 9600).with_character_size(4),
    ] {
        match harness.open(config.clone()).await {
            PortEvent::OpenFailed {
                reason: OpenError::InvalidConfig(_),
                config: echoed,
            } => assert_eq!(echoed, config),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }
    assert_eq!(harness.driver.open_calls(), 0);
}

#[tokio::test]
async fn test_refused_open_then_corrected_open() {
    let driver = MockDriver::new();
    driver.reject_when(|config| {
        (config.baud > 115_200).then(|| PortError::config("baud rate not supported"))
    });
    let mut harness = Harness::with(driver, OperatorConfig::default());

    let refused = PortConfig::new("MOCK0", 1_000_000);
    match harness.open(refused.clone()).await {
        PortEvent::OpenFailed {
            reason: OpenError::Native(PortError::Config(_)),
            config,
        } => assert_eq!(config, refused),
        other => panic!("expected OpenFailed, got {:?}", other),
    }

    let (operator, _port) = harness.open_ok(PortConfig::new("MOCK0", 115_200)).await;
    assert_eq!(operator.port(), "MOCK0");
    assert_eq!(harness.driver.open_calls(), 2);
}

#[tokio::test]
async fn test_opened_reports_applied_settings() {
    let driver = MockDriver::new();
    driver.apply_with(|config| PortConfig {
        baud: 19_200,
        ..config.clone()
    });
    let mut harness = Harness::with(driver, OperatorConfig::default());

    let request = PortConfig::new("COM1", 19_201)
        .with_character_size(7)
        .with_parity(Parity::Even)
        .with_two_stop_bits(true);
    match harness.open(request).await {
        PortEvent::Opened { config, .. } => {
            assert_eq!(config.baud, 19_200);
            assert_eq!(config.character_size, 7);
            assert_eq!(config.parity, Parity::Even);
            assert!(config.two_stop_bits);
        }
        other => panic!("expected Opened, got {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrent_opens_are_independent() {
    let harness = Harness::new();
    let (tx_a, mut rx_a) = event_channel(8);
    let (tx_b, mut rx_b) = event_channel(8);

    let (sent_a, sent_b) = tokio::join!(
        harness.manager.open(config_8n1("MOCK_A"), tx_a),
        harness.manager.open(config_8n1("MOCK_B"), tx_b),
    );
    sent_a.unwrap();
    sent_b.unwrap();

    let operator_a = match next_event(&mut rx_a).await {
        PortEvent::Opened { operator, .. } => operator,
        other => panic!("expected Opened, got {:?}", other),
    };
    let operator_b = match next_event(&mut rx_b).await {
        PortEvent::Opened { operator, .. } => operator,
        other => panic!("expected Opened, got {:?}", other),
    };
    assert_ne!(operator_a.id(), operator_b.id());

    // Closing one leaves the other untouched
    operator_a.close().await.unwrap();
    assert!(matches!(
        next_event(&mut rx_a).await,
        PortEvent::Closed { reason: None }
    ));

    let port_b = harness.driver.port("MOCK_B").unwrap();
    port_b.inject_read(b"still here");
    assert!(matches!(
        next_event(&mut rx_b).await,
        PortEvent::Received { .. }
    ));
    assert!(!port_b.is_closed());
}

#[tokio::test]
async fn test_exclusive_driver_refuses_busy_port() {
    let mut harness = Harness::with(MockDriver::new().exclusive(), OperatorConfig::default());

    let (first, _port) = harness.open_ok(config_8n1("MOCK0")).await;
    match harness.open(config_8n1("MOCK0")).await {
        PortEvent::OpenFailed {
            reason: OpenError::Native(PortError::Busy(_)),
            ..
        } => {}
        other => panic!("expected Busy, got {:?}", other),
    }

    first.close().await.unwrap();
    assert!(matches!(
        harness.next_event().await,
        PortEvent::Closed { reason: None }
    ));
    let (_again, _port) = harness.open_ok(config_8n1("MOCK0")).await;
}
