//! Port operator: exclusive owner of one open port.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────── operator task (serialized) ────────────┐
//! OperatorRef ───>│ commands ─┐                                        │
//!                 │ reads ────┼──> state machine ──> PortEvent ──> client
//!                 │ writes ───┘        │                               │
//!                 └────────────────────┼───────────────────────────────┘
//!   reader thread ── native read ──────┘ (ReadOutcome channel)
//!   blocking pool ── native write (one at a time, completion reported back)
//! ```
//!
//! All mutable state lives in the task; the reader and write tasks only touch
//! the device through their own half of the `NativeHandle`. The handle is
//! released on the transition to `Closed`, which also unblocks the reader.
//!
//! # Close policy
//!
//! A requested close drains: no new commands are accepted, queued writes run
//! to completion (acknowledged as usual), then the handle is released and
//! `Closed(None)` is sent. If draining takes longer than
//! `close_drain_timeout`, the remaining writes are abandoned. A device
//! failure skips draining and reports `Closed(Some(error))`.
//!
//! The reader keeps running while `Closing`: bytes that arrive during the
//! drain are still delivered as `Received`, and a read failure still ends the
//! drain with `Closed(Some(error))`. Releasing the handle stops it.

mod metrics;
mod reader;
mod writer;

pub use metrics::MetricsSnapshot;

use crate::config::OperatorConfig;
use crate::error::CommandError;
use crate::port::{NativeHandle, PortError};
use crate::protocol::{EventSender, OperatorCommand, PortEvent};
use crate::state::{OperatorState, PortConfig};
use metrics::PortMetrics;
use reader::ReadOutcome;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;
use writer::{PendingWrite, WriteQueue};

/// Read chunks buffered between the reader thread and the operator task.
const READ_QUEUE_DEPTH: usize = 32;

/// Client-side reference to a running operator.
///
/// Cheap to clone. Once every clone is dropped the operator closes its port
/// as if `close` had been called.
#[derive(Clone)]
pub struct OperatorRef {
    id: Uuid,
    port: Arc<str>,
    commands: mpsc::Sender<OperatorCommand>,
    metrics: Arc<PortMetrics>,
}

impl OperatorRef {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Path of the port this operator owns.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Deliver a command.
    ///
    /// # Errors
    ///
    /// - `CommandError::PortClosed` once the operator has left the `Open` state;
    ///   the command is not executed and produces no event.
    pub async fn send(&self, command: OperatorCommand) -> Result<(), CommandError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CommandError::PortClosed)
    }

    /// Queue bytes for transmission without acknowledgement.
    pub async fn write(&self, data: impl Into<Vec<u8>>) -> Result<(), CommandError> {
        self.send(OperatorCommand::Write {
            data: data.into(),
            ack: false,
        })
        .await
    }

    /// Queue bytes and ask for a `Wrote` once the device has accepted them
    /// for transmission.
    pub async fn write_acked(&self, data: impl Into<Vec<u8>>) -> Result<(), CommandError> {
        self.send(OperatorCommand::Write {
            data: data.into(),
            ack: true,
        })
        .await
    }

    /// Request a close. `Closed` follows on the event channel.
    pub async fn close(&self) -> Result<(), CommandError> {
        self.send(OperatorCommand::Close).await
    }

    /// True once the operator no longer accepts commands.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    pub fn state(&self) -> OperatorState {
        self.metrics.state()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl std::fmt::Debug for OperatorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorRef")
            .field("id", &self.id)
            .field("port", &self.port)
            .field("state", &self.state())
            .finish()
    }
}

/// The actor behind an `OperatorRef`.
pub struct Operator {
    config: PortConfig,
    handle: Option<NativeHandle>,
    state: OperatorState,
    events: EventSender,
    commands: mpsc::Receiver<OperatorCommand>,
    reads: mpsc::Receiver<ReadOutcome>,
    writes: WriteQueue,
    drain_deadline: Option<Instant>,
    settings: OperatorConfig,
    metrics: Arc<PortMetrics>,
}

impl Operator {
    /// Take ownership of an open port and start serving it.
    ///
    /// The first event delivered to `reply_to` is `Opened`, carrying a
    /// reference to this operator. Must be called within a tokio runtime.
    pub fn spawn(
        handle: NativeHandle,
        applied: PortConfig,
        reply_to: EventSender,
        settings: OperatorConfig,
    ) -> OperatorRef {
        let id = Uuid::new_v4();
        let (command_tx, command_rx) = mpsc::channel(settings.command_capacity.max(1));
        let (read_tx, read_rx) = mpsc::channel(READ_QUEUE_DEPTH);
        let metrics = Arc::new(PortMetrics::new());

        let operator_ref = OperatorRef {
            id,
            port: Arc::from(applied.port.as_str()),
            commands: command_tx,
            metrics: Arc::clone(&metrics),
        };

        let span = info_span!("operator", %id, port = %applied.port);
        let operator = Operator {
            config: applied,
            handle: Some(handle),
            state: OperatorState::Open,
            events: reply_to,
            commands: command_rx,
            reads: read_rx,
            writes: WriteQueue::default(),
            drain_deadline: None,
            settings,
            metrics,
        };

        tokio::spawn(
            operator
                .run(operator_ref.clone(), read_tx)
                .instrument(span),
        );
        operator_ref
    }

    async fn run(mut self, greeting: OperatorRef, read_tx: mpsc::Sender<ReadOutcome>) {
        let opened = PortEvent::Opened {
            config: self.config.clone(),
            operator: greeting,
        };
        if self.events.send(opened).await.is_err() {
            warn!("Requester went away before {} was reported open", self.config.port);
            self.shut_down();
            return;
        }
        info!("Opened {}", self.config);

        let Some(read_half) = self.handle.as_ref().map(NativeHandle::read_half) else {
            return;
        };
        if let Err(e) = reader::spawn(read_half, read_tx, self.settings.read_buffer_size) {
            error!("Failed to start reader for {}: {}", self.config.port, e);
            self.finish(Some(PortError::Io(e))).await;
            return;
        }

        while self.state != OperatorState::Closed {
            tokio::select! {
                outcome = self.reads.recv() => self.on_read(outcome).await,
                (write, result) = self.writes.completion(), if self.writes.is_busy() => {
                    self.on_write_complete(write, result).await
                }
                command = self.commands.recv(), if self.state == OperatorState::Open => {
                    self.on_command(command).await
                }
                _ = drain_expired(self.drain_deadline) => self.on_drain_timeout().await,
            }
        }
        debug!("Operator for {} stopped", self.config.port);
    }

    async fn on_read(&mut self, outcome: Option<ReadOutcome>) {
        match outcome {
            Some(ReadOutcome::Data(data)) => {
                self.metrics.record_received(data.len());
                self.emit(PortEvent::Received { data }).await;
            }
            Some(ReadOutcome::Eof) => {
                let error = PortError::disconnected(self.config.port.clone());
                self.fail(error).await;
            }
            Some(ReadOutcome::Failed(e)) => self.fail(e).await,
            None => self.fail(PortError::other("reader stopped unexpectedly")).await,
        }
    }

    async fn on_command(&mut self, command: Option<OperatorCommand>) {
        match command {
            Some(OperatorCommand::Write { data, ack }) => {
                self.writes.push(PendingWrite { data, ack });
                self.pump();
            }
            Some(OperatorCommand::Close) => self.begin_close("close requested").await,
            None => self.begin_close("all operator references dropped").await,
        }
    }

    async fn on_write_complete(&mut self, write: PendingWrite, result: Result<(), PortError>) {
        if let Err(e) = result {
            self.fail(e).await;
            return;
        }

        self.metrics.record_written(write.data.len(), write.ack);
        self.pump();
        if write.ack {
            self.emit(PortEvent::Wrote { data: write.data }).await;
        }
        if self.state == OperatorState::Closing && self.writes.is_idle() {
            self.finish(None).await;
        }
    }

    async fn on_drain_timeout(&mut self) {
        warn!(
            "Close of {} timed out after {:?} with {} write(s) outstanding",
            self.config.port,
            self.settings.close_drain_timeout(),
            self.writes.outstanding()
        );
        self.finish(None).await;
    }

    /// Start the next queued write, if any.
    fn pump(&mut self) {
        if let Some(handle) = self.handle.as_ref() {
            self.writes.pump(&handle.write_half());
        }
    }

    fn set_state(&mut self, state: OperatorState) {
        debug!("{} -> {}", self.state, state);
        self.state = state;
        self.metrics.set_state(state);
    }

    async fn begin_close(&mut self, why: &str) {
        debug!("Closing {}: {}", self.config.port, why);
        self.set_state(OperatorState::Closing);
        self.commands.close();

        if self.writes.is_idle() {
            self.finish(None).await;
        } else {
            debug!("Draining {} queued write(s)", self.writes.outstanding());
            self.drain_deadline = Some(Instant::now() + self.settings.close_drain_timeout());
        }
    }

    async fn fail(&mut self, error: PortError) {
        if self.state == OperatorState::Closed {
            return;
        }
        warn!("{} failed: {}", self.config.port, error);
        self.finish(Some(error)).await;
    }

    /// Enter `Closed` and report it. The only place `Closed` is emitted.
    async fn finish(&mut self, reason: Option<PortError>) {
        if self.state == OperatorState::Closed {
            return;
        }
        self.shut_down();
        info!("Closed {}", self.config.port);
        if self.events.send(PortEvent::Closed { reason }).await.is_err() {
            debug!("Client left before Closed could be delivered");
        }
    }

    /// Release everything without emitting. Idempotent.
    fn shut_down(&mut self) {
        if self.state != OperatorState::Closed {
            self.set_state(OperatorState::Closed);
        }
        self.commands.close();
        self.drain_deadline = None;

        let mut discarded = 0;
        while self.commands.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!("Discarded {} command(s) received after close", discarded);
        }

        let abandoned = self.writes.abandon();
        if abandoned > 0 {
            warn!("Abandoned {} write(s) on {}", abandoned, self.config.port);
        }

        if let Some(handle) = self.handle.take() {
            handle.release();
        }
    }

    /// Deliver a non-terminal event. A vanished client means nobody is left
    /// to serve, so the port is released silently.
    async fn emit(&mut self, event: PortEvent) {
        if self.state == OperatorState::Closed {
            return;
        }
        if self.events.send(event).await.is_err() {
            debug!("Client event channel closed; releasing {}", self.config.port);
            self.shut_down();
        }
    }
}

async fn drain_expired(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
