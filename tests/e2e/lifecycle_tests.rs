//! Operator lifecycle E2E tests: open -> write -> receive -> close
//!
//! These tests verify:
//! - The full event sequence for a healthy port
//! - Write ordering and acknowledgement
//! - Draining queued writes on close
//! - Client departure (dropped references or receiver)

use crate::common::{config_8n1, wait_until, Harness};
use pretty_assertions::assert_eq;
use serial_operator::{
    OperatorConfig, OperatorState, PortConfig, PortEvent,
};

#[tokio::test]
async fn test_full_session_open_write_receive_close() {
    let mut harness = Harness::new();

    // Open
    let event = harness.open(config_8n1("MOCK0")).await;
    let operator = match event {
        PortEvent::Opened { config, operator } => {
            assert_eq!(config, PortConfig::new("MOCK0", 9600));
            operator
        }
        other => panic!("expected Opened, got {:?}", other),
    };
    let port = harness.driver.port("MOCK0").unwrap();

    // Acknowledged write
    operator.write_acked(b"AB".to_vec()).await.unwrap();
    match harness.next_event().await {
        PortEvent::Wrote { data } => assert_eq!(data, b"AB".to_vec()),
        other => panic!("expected Wrote, got {:?}", other),
    }
    assert_eq!(port.write_log(), vec![b"AB".to_vec()]);

    // Incoming bytes
    port.inject_read(b"XY");
    match harness.next_event().await {
        PortEvent::Received { data } => assert_eq!(data, b"XY".to_vec()),
        other => panic!("expected Received, got {:?}", other),
    }
    // Reader is parked in its next read
    wait_until(|| port.read_calls() == 2).await;

    // Close
    operator.close().await.unwrap();
    assert!(matches!(
        harness.next_event().await,
        PortEvent::Closed { reason: None }
    ));

    // Device traffic after Closed goes nowhere
    let reads_at_close = port.read_calls();
    port.inject_read(b"late");
    harness.assert_no_event().await;
    assert_eq!(port.read_calls(), reads_at_close);

    assert_eq!(port.close_count(), 1);
    assert_eq!(operator.state(), OperatorState::Closed);
    assert_eq!(harness.driver.live_ports(), 0);
}

#[tokio::test]
async fn test_received_chunks_keep_device_order() {
    let mut harness = Harness::new();
    let (_operator, port) = harness.open_ok(config_8n1("MOCK0")).await;

    port.inject_read(b"first ");
    port.inject_read(b"second ");
    port.inject_read(b"third");

    let mut received = Vec::new();
    while received.len() < b"first second third".len() {
        match harness.next_event().await {
            PortEvent::Received { data } => received.extend(data),
            other => panic!("expected Received, got {:?}", other),
        }
    }
    assert_eq!(received, b"first second third".to_vec());
}

#[tokio::test]
async fn test_unacknowledged_write_emits_nothing() {
    let mut harness = Harness::new();
    let (operator, port) = harness.open_ok(config_8n1("MOCK0")).await;

    operator.write(b"quiet".to_vec()).await.unwrap();
    operator.write_acked(b"loud".to_vec()).await.unwrap();

    // Only the acknowledged write is reported, after the silent one went out
    match harness.next_event().await {
        PortEvent::Wrote { data } => assert_eq!(data, b"loud".to_vec()),
        other => panic!("expected Wrote, got {:?}", other),
    }
    assert_eq!(port.write_log(), vec![b"quiet".to_vec(), b"loud".to_vec()]);
    harness.assert_no_event().await;
}

#[tokio::test]
async fn test_acknowledgements_follow_acceptance_order() {
    let mut harness = Harness::new();
    let (operator, port) = harness.open_ok(config_8n1("MOCK0")).await;
    port.set_max_write_chunk(Some(1));

    for chunk in [&b"one"[..], b"two", b"three"] {
        operator.write_acked(chunk.to_vec()).await.unwrap();
    }

    let mut acked = Vec::new();
    for _ in 0..3 {
        match harness.next_event().await {
            PortEvent::Wrote { data } => acked.push(data),
            other => panic!("expected Wrote, got {:?}", other),
        }
    }
    assert_eq!(
        acked,
        vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
    );
    assert_eq!(port.written_bytes(), b"onetwothree".to_vec());
}

#[tokio::test]
async fn test_empty_write_is_acknowledged_without_native_call() {
    let mut harness = Harness::new();
    let (operator, port) = harness.open_ok(config_8n1("MOCK0")).await;

    operator.write_acked(Vec::new()).await.unwrap();
    match harness.next_event().await {
        PortEvent::Wrote { data } => assert!(data.is_empty()),
        other => panic!("expected Wrote, got {:?}", other),
    }
    assert!(port.write_log().is_empty());
}

#[tokio::test]
async fn test_close_drains_queued_writes() {
    let mut harness = Harness::new();
    let (operator, port) = harness.open_ok(config_8n1("MOCK0")).await;
    port.block_writes();

    operator.write_acked(b"A".to_vec()).await.unwrap();
    operator.write_acked(b"B".to_vec()).await.unwrap();
    operator.close().await.unwrap();

    wait_until(|| operator.state() == OperatorState::Closing).await;
    assert!(operator.is_closed(), "closing operator must refuse commands");
    port.release_writes();

    let mut sequence = Vec::new();
    for _ in 0..3 {
        sequence.push(harness.next_event().await);
    }
    assert!(matches!(&sequence[0], PortEvent::Wrote { data } if data == b"A"));
    assert!(matches!(&sequence[1], PortEvent::Wrote { data } if data == b"B"));
    assert!(matches!(&sequence[2], PortEvent::Closed { reason: None }));
    assert_eq!(port.write_log(), vec![b"A".to_vec(), b"B".to_vec()]);
    assert_eq!(port.close_count(), 1);
}

#[tokio::test]
async fn test_reads_are_delivered_while_draining() {
    let mut harness = Harness::new();
    let (operator, port) = harness.open_ok(config_8n1("MOCK0")).await;
    port.block_writes();

    operator.write_acked(b"out".to_vec()).await.unwrap();
    operator.close().await.unwrap();
    wait_until(|| operator.state() == OperatorState::Closing).await;

    port.inject_read(b"in");
    match harness.next_event().await {
        PortEvent::Received { data } => assert_eq!(data, b"in".to_vec()),
        other => panic!("expected Received, got {:?}", other),
    }

    port.release_writes();
    assert!(matches!(harness.next_event().await, PortEvent::Wrote { .. }));
    assert!(matches!(
        harness.next_event().await,
        PortEvent::Closed { reason: None }
    ));
}

#[tokio::test]
async fn test_close_drain_timeout_abandons_writes() {
    let settings = OperatorConfig {
        close_drain_timeout_ms: 50,
        ..OperatorConfig::default()
    };
    let mut harness = Harness::with_settings(settings);
    let (operator, port) = harness.open_ok(config_8n1("MOCK0")).await;
    port.block_writes();

    operator.write_acked(b"stuck".to_vec()).await.unwrap();
    operator.close().await.unwrap();

    assert!(matches!(
        harness.next_event().await,
        PortEvent::Closed { reason: None }
    ));
    harness.assert_no_event().await;
    assert!(port.write_log().is_empty());
    assert_eq!(port.close_count(), 1);
}

#[tokio::test]
async fn test_dropping_every_reference_closes_port() {
    let mut harness = Harness::new();
    let (operator, port) = harness.open_ok(config_8n1("MOCK0")).await;
    let second = operator.clone();

    drop(operator);
    harness.assert_no_event().await;
    assert!(!port.is_closed(), "a live clone keeps the port open");

    drop(second);
    assert!(matches!(
        harness.next_event().await,
        PortEvent::Closed { reason: None }
    ));
    assert_eq!(port.close_count(), 1);
}

#[tokio::test]
async fn test_dropping_event_receiver_releases_port() {
    let harness = Harness::new();
    let Harness {
        driver,
        manager,
        mut events,
        ..
    } = harness;

    let (tx, mut own_events) = serial_operator::event_channel(8);
    manager.open(config_8n1("MOCK0"), tx).await.unwrap();
    let operator = match crate::common::next_event(&mut own_events).await {
        PortEvent::Opened { operator, .. } => operator,
        other => panic!("expected Opened, got {:?}", other),
    };
    drop(own_events);

    let port = driver.port("MOCK0").unwrap();
    port.inject_read(b"nobody listening");
    wait_until(|| port.is_closed()).await;

    assert_eq!(port.close_count(), 1);
    assert_eq!(operator.state(), OperatorState::Closed);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_metrics_reflect_traffic() {
    let mut harness = Harness::new();
    let (operator, port) = harness.open_ok(config_8n1("MOCK0")).await;

    operator.write_acked(b"ATZ\r\n".to_vec()).await.unwrap();
    let _ = harness.next_event().await;
    port.inject_read(b"OK\r\n");
    let _ = harness.next_event().await;

    let metrics = operator.metrics();
    assert_eq!(metrics.state, OperatorState::Open);
    assert_eq!(metrics.bytes_written, 5);
    assert_eq!(metrics.bytes_received, 4);
    assert_eq!(metrics.writes_acknowledged, 1);
}
