//! Ordering properties over arbitrary traffic.
//!
//! - Native writes happen in acceptance order, acknowledgements likewise
//! - Received bytes concatenate to exactly what the device produced

use crate::common::{config_8n1, Harness};
use proptest::prelude::*;
use serial_operator::PortEvent;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_writes_and_acks_keep_acceptance_order(
        writes in prop::collection::vec(
            (prop::collection::vec(any::<u8>(), 0..16), any::<bool>()),
            1..12,
        ),
        max_chunk in prop::option::of(1usize..4),
    ) {
        let (native, acked) = runtime().block_on(async {
            let mut harness = Harness::new();
            let (operator, port) = harness.open_ok(config_8n1("MOCK0")).await;
            port.set_max_write_chunk(max_chunk);

            for (data, ack) in &writes {
                if *ack {
                    operator.write_acked(data.clone()).await.unwrap();
                } else {
                    operator.write(data.clone()).await.unwrap();
                }
            }
            operator.close().await.unwrap();

            let mut acked = Vec::new();
            loop {
                match harness.next_event().await {
                    PortEvent::Wrote { data } => acked.push(data),
                    PortEvent::Closed { reason: None } => break,
                    other => panic!("unexpected event: {:?}", other),
                }
            }
            (port.written_bytes(), acked)
        });

        let expected_native: Vec<u8> = writes.iter().flat_map(|(d, _)| d.clone()).collect();
        let expected_acked: Vec<Vec<u8>> = writes
            .iter()
            .filter(|(_, ack)| *ack)
            .map(|(d, _)| d.clone())
            .collect();
        prop_assert_eq!(native, expected_native);
        prop_assert_eq!(acked, expected_acked);
    }

    #[test]
    fn prop_received_bytes_preserve_device_order(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..64), 1..10),
    ) {
        let expected: Vec<u8> = chunks.concat();
        let received = runtime().block_on(async {
            let mut harness = Harness::new();
            let (_operator, port) = harness.open_ok(config_8n1("MOCK0")).await;
            for chunk in &chunks {
                port.inject_read(chunk);
            }

            let mut received = Vec::new();
            while received.len() < expected.len() {
                match harness.next_event().await {
                    PortEvent::Received { data } => received.extend(data),
                    other => panic!("unexpected event: {:?}", other),
                }
            }
            received
        });

        prop_assert_eq!(received, expected);
    }
}
