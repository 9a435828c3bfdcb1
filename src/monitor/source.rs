// src/monitor/source.rs

//! Event sources: lazy, suspending sequences of [`WorkflowEvent`]s.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, trace, warn};

use crate::errors::Result;
use crate::monitor::event::{EventParser, WorkflowEvent};

/// Boxed future returned by [`EventSource::next_event`].
pub type NextEvent<'a> =
    Pin<Box<dyn Future<Output = Result<Option<WorkflowEvent>>> + Send + 'a>>;

/// An append-only stream of events.
///
/// `next_event` suspends until an event is available. `Ok(None)` means the
/// source ended (closed or its producer went away); a live log never ends on
/// its own.
pub trait EventSource: Send {
    fn next_event(&mut self) -> NextEvent<'_>;

    /// Release the underlying handle. Subsequent calls to `next_event`
    /// return `Ok(None)`.
    fn close(&mut self);
}

/// Events fed through a channel, for synthetic logs and tests.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<WorkflowEvent>,
    consumed: usize,
    closed: bool,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<WorkflowEvent>) -> Self {
        Self {
            rx,
            consumed: 0,
            closed: false,
        }
    }

    /// Number of events handed out so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

impl EventSource for ChannelSource {
    fn next_event(&mut self) -> NextEvent<'_> {
        Box::pin(async move {
            if self.closed {
                return Ok(None);
            }
            let event = self.rx.recv().await;
            if event.is_some() {
                self.consumed += 1;
            }
            Ok(event)
        })
    }

    fn close(&mut self) {
        self.closed = true;
        self.rx.close();
    }
}

/// Follows an HTCondor user log as it grows.
///
/// At end of file the tail waits for a filesystem notification for the log
/// (or a slow fallback tick, in case notifications are unavailable) instead
/// of spinning. A log that does not exist yet is waited for the same way.
pub struct LogTail {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    line: String,
    parser: EventParser,
    wake_rx: mpsc::UnboundedReceiver<()>,
    watcher: Option<RecommendedWatcher>,
    fallback: Duration,
    closed: bool,
}

impl std::fmt::Debug for LogTail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogTail")
            .field("path", &self.path)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl LogTail {
    pub const DEFAULT_FALLBACK: Duration = Duration::from_secs(2);

    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_fallback(path, Self::DEFAULT_FALLBACK)
    }

    pub fn with_fallback(path: impl Into<PathBuf>, fallback: Duration) -> Self {
        let path = path.into();
        let (wake_tx, wake_rx) = mpsc::unbounded_channel();

        let watcher = match spawn_log_watcher(&path, wake_tx) {
            Ok(w) => Some(w),
            Err(e) => {
                warn!(
                    path = ?path,
                    error = %e,
                    "file notifications unavailable; using periodic checks"
                );
                None
            }
        };

        Self {
            path,
            reader: None,
            line: String::new(),
            parser: EventParser::new(),
            wake_rx,
            watcher,
            fallback,
            closed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn next_inner(&mut self) -> Result<Option<WorkflowEvent>> {
        loop {
            if self.closed {
                return Ok(None);
            }

            let Some(reader) = self.reader.as_mut() else {
                match File::open(&self.path).await {
                    Ok(file) => {
                        debug!(path = ?self.path, "opened event log");
                        self.reader = Some(BufReader::new(file));
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        trace!(path = ?self.path, "event log not there yet");
                        self.wait_for_change().await;
                    }
                    Err(e) => return Err(e.into()),
                }
                continue;
            };

            // `read_line` appends, so a line split across writes is completed
            // on a later pass.
            let n = reader.read_line(&mut self.line).await?;
            if n == 0 || !self.line.ends_with('\n') {
                self.wait_for_change().await;
                continue;
            }

            let line = std::mem::take(&mut self.line);
            if let Some(event) = self.parser.feed(&line) {
                return Ok(Some(event));
            }
        }
    }

    async fn wait_for_change(&mut self) {
        if self.watcher.is_some() {
            tokio::select! {
                woke = self.wake_rx.recv() => {
                    if woke.is_none() {
                        self.watcher = None;
                    }
                }
                _ = sleep(self.fallback) => {}
            }
        } else {
            sleep(self.fallback).await;
        }

        // Collapse a burst of notifications into one wake-up.
        while self.wake_rx.try_recv().is_ok() {}
    }
}

impl EventSource for LogTail {
    fn next_event(&mut self) -> NextEvent<'_> {
        Box::pin(self.next_inner())
    }

    fn close(&mut self) {
        if !self.closed {
            debug!(path = ?self.path, "closing event log");
        }
        self.closed = true;
        self.reader = None;
        self.watcher = None;
        self.wake_rx.close();
    }
}

/// Watch the log's parent directory; the log itself may not exist yet.
fn spawn_log_watcher(
    path: &Path,
    wake_tx: mpsc::UnboundedSender<()>,
) -> notify::Result<RecommendedWatcher> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path.file_name().map(|n| n.to_os_string());

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            // Called on notify's own thread; only nudge the async side.
            if let Ok(event) = res {
                let relevant = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if relevant {
                    let _ = wake_tx.send(());
                }
            }
        },
        Config::default(),
    )?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
