//! Background reader.
//!
//! One OS thread per open port sits in the native read call and forwards each
//! chunk into the operator's serialized loop. The thread exits after the first
//! terminal outcome, or as soon as the operator stops listening.

use crate::port::handle::ReadHalf;
use crate::port::PortError;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// What one native read produced.
#[derive(Debug)]
pub(crate) enum ReadOutcome {
    Data(Vec<u8>),
    Eof,
    Failed(PortError),
}

pub(crate) fn spawn(
    port: ReadHalf,
    outcomes: mpsc::Sender<ReadOutcome>,
    buffer_size: usize,
) -> std::io::Result<JoinHandle<()>> {
    let thread_name = format!("serial-reader:{}", port.name());
    thread::Builder::new()
        .name(thread_name)
        .spawn(move || read_loop(port, outcomes, buffer_size))
}

fn read_loop(port: ReadHalf, outcomes: mpsc::Sender<ReadOutcome>, buffer_size: usize) {
    let mut buffer = vec![0u8; buffer_size.max(1)];

    loop {
        let outcome = match port.read(&mut buffer) {
            Ok(0) => ReadOutcome::Eof,
            Ok(n) => {
                trace!("Read {} bytes from {}", n, port.name());
                ReadOutcome::Data(buffer[..n].to_vec())
            }
            Err(e) => ReadOutcome::Failed(e),
        };
        let terminal = !matches!(outcome, ReadOutcome::Data(_));

        // Blocks while the operator is behind, which pushes back on the device.
        if outcomes.blocking_send(outcome).is_err() {
            debug!("Operator for {} stopped listening; reader exiting", port.name());
            return;
        }
        if terminal {
            debug!("Reader for {} finished", port.name());
            return;
        }
    }
}
