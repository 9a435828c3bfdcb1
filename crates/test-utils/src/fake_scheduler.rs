use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dagsubmit::compile::CompiledArtifact;
use dagsubmit::errors::{DagSubmitError, Result};
use dagsubmit::submit::{SchedulerBackend, Transaction};
use dagsubmit::types::{RunHandle, WorkingDirMode};

/// A fake scheduler that:
/// - records every backend call (`begin`, `queue <dir>`, `commit`, `rollback`)
/// - hands out a fixed cluster id
/// - can be told to fail `queue`, `commit` or `rollback`
/// - optionally writes a DAGMan event log on `queue`, so a waiting caller
///   has something to read.
pub struct FakeScheduler {
    calls: Arc<Mutex<Vec<String>>>,
    cwd_at_queue: Arc<Mutex<Option<PathBuf>>>,
    cluster: u64,
    mode: WorkingDirMode,
    fail_queue: bool,
    fail_commit: bool,
    fail_rollback: bool,
    event_log: Option<String>,
    next_txn: u64,
}

impl FakeScheduler {
    pub fn new(calls: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            calls,
            cwd_at_queue: Arc::new(Mutex::new(None)),
            cluster: 42,
            mode: WorkingDirMode::PerCall,
            fail_queue: false,
            fail_commit: false,
            fail_rollback: false,
            event_log: None,
            next_txn: 0,
        }
    }

    pub fn cluster(mut self, id: u64) -> Self {
        self.cluster = id;
        self
    }

    pub fn mode(mut self, mode: WorkingDirMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn failing_queue(mut self) -> Self {
        self.fail_queue = true;
        self
    }

    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    pub fn failing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    /// Text written to `artifact.dagman_log()` when the DAG is queued.
    pub fn with_event_log(mut self, text: impl Into<String>) -> Self {
        self.event_log = Some(text.into());
        self
    }

    /// Process working directory observed during the last `queue` call.
    pub fn cwd_at_queue(&self) -> Arc<Mutex<Option<PathBuf>>> {
        Arc::clone(&self.cwd_at_queue)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl SchedulerBackend for FakeScheduler {
    fn working_dir_mode(&self) -> WorkingDirMode {
        self.mode
    }

    fn begin_transaction(&mut self) -> Result<Transaction> {
        self.record("begin".to_string());
        self.next_txn += 1;
        Ok(Transaction {
            id: self.next_txn,
            queued: Vec::new(),
        })
    }

    fn queue(
        &mut self,
        txn: &mut Transaction,
        artifact: &CompiledArtifact,
        work_dir: &Path,
    ) -> Result<RunHandle> {
        self.record(format!("queue {}", work_dir.display()));
        *self.cwd_at_queue.lock().unwrap() = std::env::current_dir().ok();

        if self.fail_queue {
            return Err(DagSubmitError::Submission("queue refused".to_string()));
        }

        if let Some(text) = &self.event_log {
            std::fs::write(artifact.dagman_log(), text)?;
        }

        let handle = RunHandle::new(self.cluster);
        txn.queued.push(handle);
        Ok(handle)
    }

    fn commit(&mut self, _txn: &mut Transaction) -> Result<()> {
        self.record("commit".to_string());
        if self.fail_commit {
            return Err(DagSubmitError::Submission("commit refused".to_string()));
        }
        Ok(())
    }

    fn rollback(&mut self, txn: Transaction) -> Result<()> {
        self.record(format!("rollback {}", txn.queued.len()));
        if self.fail_rollback {
            return Err(DagSubmitError::Submission("rollback refused".to_string()));
        }
        Ok(())
    }
}
