//! Ordered write path.
//!
//! Writes are queued FIFO and submitted one at a time on tokio's blocking
//! pool, so a slow device never stalls the operator loop. The next write only
//! starts once the previous one has completed, which keeps native submission
//! and acknowledgement order identical to acceptance order.

use crate::port::handle::WriteHalf;
use crate::port::PortError;
use std::collections::VecDeque;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingWrite {
    pub(crate) data: Vec<u8>,
    pub(crate) ack: bool,
}

/// Result of the write that was in flight.
pub(crate) type WriteCompletion = (PendingWrite, Result<(), PortError>);

#[derive(Debug, Default)]
pub(crate) struct WriteQueue {
    pending: VecDeque<PendingWrite>,
    in_flight: Option<JoinHandle<WriteCompletion>>,
}

impl WriteQueue {
    pub(crate) fn push(&mut self, write: PendingWrite) {
        self.pending.push_back(write);
    }

    /// No write queued and none in flight.
    pub(crate) fn is_idle(&self) -> bool {
        self.in_flight.is_none() && self.pending.is_empty()
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Writes not yet completed, including the one in flight.
    pub(crate) fn outstanding(&self) -> usize {
        self.pending.len() + usize::from(self.in_flight.is_some())
    }

    /// Start the next queued write if nothing is in flight.
    pub(crate) fn pump(&mut self, port: &WriteHalf) {
        if self.in_flight.is_some() {
            return;
        }
        let Some(write) = self.pending.pop_front() else {
            return;
        };
        let port = port.clone();
        self.in_flight = Some(tokio::task::spawn_blocking(move || {
            let result = port.write_all(&write.data);
            (write, result)
        }));
    }

    /// Wait for the in-flight write. Pending forever when there is none.
    ///
    /// Cancel safe: dropping the future leaves the in-flight write in place.
    pub(crate) async fn completion(&mut self) -> WriteCompletion {
        let Some(task) = self.in_flight.as_mut() else {
            return std::future::pending().await;
        };
        let joined = task.await;
        self.in_flight = None;
        match joined {
            Ok(completion) => completion,
            Err(e) => (
                PendingWrite {
                    data: Vec::new(),
                    ack: false,
                },
                Err(PortError::other(format!("write task failed: {e}"))),
            ),
        }
    }

    /// Forget every write. An in-flight native call is left to fail on the
    /// released handle. Returns how many writes were dropped.
    pub(crate) fn abandon(&mut self) -> usize {
        let dropped = self.outstanding();
        self.pending.clear();
        self.in_flight = None;
        dropped
    }
}
