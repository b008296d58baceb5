//! Counters shared between an operator and its references.

use crate::state::OperatorState;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Instant;

/// Live counters. Only the operator task writes them.
#[derive(Debug)]
pub(crate) struct PortMetrics {
    bytes_received: AtomicU64,
    bytes_written: AtomicU64,
    writes_acknowledged: AtomicU64,
    state: AtomicU8,
    opened_at: Instant,
}

impl PortMetrics {
    pub(crate) fn new() -> Self {
        Self {
            bytes_received: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            writes_acknowledged: AtomicU64::new(0),
            state: AtomicU8::new(OperatorState::Open.as_u8()),
            opened_at: Instant::now(),
        }
    }

    pub(crate) fn record_received(&self, n: usize) {
        self.bytes_received.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_written(&self, n: usize, acknowledged: bool) {
        self.bytes_written.fetch_add(n as u64, Ordering::Relaxed);
        if acknowledged {
            self.writes_acknowledged.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn set_state(&self, state: OperatorState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    pub(crate) fn state(&self) -> OperatorState {
        OperatorState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            state: self.state(),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            writes_acknowledged: self.writes_acknowledged.load(Ordering::Relaxed),
            open_duration_ms: self.opened_at.elapsed().as_millis() as u64,
        }
    }
}

/// Point-in-time view of an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub state: OperatorState,
    pub bytes_received: u64,
    pub bytes_written: u64,
    pub writes_acknowledged: u64,
    pub open_duration_ms: u64,
}
