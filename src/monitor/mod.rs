// src/monitor/mod.rs

//! Waiting for a submitted workflow to finish.
//!
//! - [`event`] defines events and the user-log parser.
//! - [`source`] provides event sources: a live log tail and a channel.
//!
//! [`EventMonitor::await_terminal`] only looks at events of the top-level
//! run; node jobs spawned by DAGMan log under other cluster ids and are
//! skipped.

pub mod event;
pub mod source;

use std::io;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::types::{RunHandle, TerminalOutcome};

pub use event::{EventKind, EventParser, WorkflowEvent};
pub use source::{ChannelSource, EventSource, LogTail};

/// Requests cancellation of an in-progress wait.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Debug)]
pub struct EventMonitor {
    cancel: Arc<watch::Sender<bool>>,
}

impl Default for EventMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl EventMonitor {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            cancel: Arc::new(tx),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: Arc::clone(&self.cancel),
        }
    }

    /// Consume `source` until the terminal event for `run_id`.
    ///
    /// There is no timeout. The source is closed before returning, whatever
    /// the outcome.
    pub async fn await_terminal<S>(
        &self,
        run_id: RunHandle,
        source: &mut S,
    ) -> Result<TerminalOutcome>
    where
        S: EventSource + ?Sized,
    {
        let outcome = self.consume(run_id, source).await;
        source.close();
        outcome
    }

    async fn consume<S>(&self, run_id: RunHandle, source: &mut S) -> Result<TerminalOutcome>
    where
        S: EventSource + ?Sized,
    {
        let mut cancel_rx = self.cancel.subscribe();

        loop {
            if *cancel_rx.borrow_and_update() {
                info!(run = %run_id, "wait cancelled");
                return Ok(TerminalOutcome::Cancelled);
            }

            let next = tokio::select! {
                next = source.next_event() => next?,
                _ = cancel_rx.changed() => continue,
            };

            let Some(event) = next else {
                warn!(run = %run_id, "event source ended before a terminal event");
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("event log ended before run {run_id} reached a terminal state"),
                )
                .into());
            };

            if event.run_id != run_id {
                debug!(run = %event.run_id, kind = ?event.kind, "ignoring event of another run");
                continue;
            }

            info!(run = %run_id, event = %event, "workflow event");
            match event.kind {
                EventKind::Terminated => return Ok(TerminalOutcome::Success),
                EventKind::Aborted => return Ok(TerminalOutcome::Failure),
                _ => {}
            }
        }
    }
}
