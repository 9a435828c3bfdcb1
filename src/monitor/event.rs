// src/monitor/event.rs

//! Job events as read from an HTCondor user log.
//!
//! An event in the classic log format looks like:
//!
//! ```text
//! 005 (1234.000.000) 2024-05-01 12:00:03 Job terminated.
//!     (1) Normal termination (return value 0)
//! ...
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::RunHandle;

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{3}) \((\d+)\.(\d+)\.(\d+)\) (\S+ \S+) ?(.*)$").expect("static regex")
});

const TERMINATOR: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Submitted,
    Executing,
    Terminated,
    Aborted,
    Held,
    Released,
    Other(u16),
}

impl EventKind {
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => EventKind::Submitted,
            1 => EventKind::Executing,
            5 => EventKind::Terminated,
            9 => EventKind::Aborted,
            12 => EventKind::Held,
            13 => EventKind::Released,
            other => EventKind::Other(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            EventKind::Submitted => 0,
            EventKind::Executing => 1,
            EventKind::Terminated => 5,
            EventKind::Aborted => 9,
            EventKind::Held => 12,
            EventKind::Released => 13,
            EventKind::Other(code) => *code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowEvent {
    pub timestamp: String,
    pub kind: EventKind,
    pub run_id: RunHandle,
    /// Header text plus any indented body lines, joined with `"; "`.
    pub detail: String,
}

impl WorkflowEvent {
    pub fn new(kind: EventKind, run_id: RunHandle) -> Self {
        Self {
            timestamp: String::new(),
            kind,
            run_id,
            detail: String::new(),
        }
    }
}

impl fmt::Display for WorkflowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:03} ({}) {} {:?}",
            self.kind.code(),
            self.run_id,
            self.timestamp,
            self.kind
        )?;
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// Line-oriented parser; feed it complete lines in order.
#[derive(Debug, Default)]
pub struct EventParser {
    pending: Option<WorkflowEvent>,
}

impl EventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one line; returns an event once its `...` terminator is seen.
    ///
    /// Lines outside an event are skipped, and a header that arrives before
    /// the previous event was terminated replaces it.
    pub fn feed(&mut self, line: &str) -> Option<WorkflowEvent> {
        let line = line.trim_end();

        if line == TERMINATOR {
            return self.pending.take();
        }

        if let Some(caps) = HEADER.captures(line) {
            let code = caps[1].parse::<u16>().ok()?;
            let cluster = caps[2].parse::<u64>().ok()?;
            self.pending = Some(WorkflowEvent {
                timestamp: caps[5].to_string(),
                kind: EventKind::from_code(code),
                run_id: RunHandle::new(cluster),
                detail: caps[6].trim().to_string(),
            });
            return None;
        }

        if let Some(event) = self.pending.as_mut() {
            let body = line.trim();
            if !body.is_empty() {
                if !event.detail.is_empty() {
                    event.detail.push_str("; ");
                }
                event.detail.push_str(body);
            }
        }
        None
    }
}
