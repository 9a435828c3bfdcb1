// src/submit/mod.rs

//! Transactional hand-off of a compiled DAG to the scheduler.
//!
//! - [`SchedulerBackend`] is the capability the client needs from a
//!   scheduler binding (begin / queue / commit / rollback).
//! - [`condor`] provides the HTCondor command-line implementation.
//! - [`workdir`] holds the scoped working-directory guard used for bindings
//!   that cannot take a working directory per call.

pub mod condor;
pub mod workdir;

use std::path::Path;

use tracing::{error, info, warn};

use crate::compile::CompiledArtifact;
use crate::errors::{DagSubmitError, Result};
use crate::types::{RunHandle, WorkingDirMode};

pub use condor::{CondorCli, CondorTools};
pub use workdir::WorkingDirGuard;

/// Backend-side state of an open transaction.
///
/// `queued` collects what the backend created so that commit and rollback
/// know what to act on.
#[derive(Debug, Default)]
pub struct Transaction {
    pub id: u64,
    pub queued: Vec<RunHandle>,
}

/// Scheduler binding used by [`SubmissionClient`].
///
/// Implementations must keep queued work invisible to the scheduler's
/// execution engine until `commit`; `rollback` must undo anything `queue`
/// created.
pub trait SchedulerBackend {
    fn working_dir_mode(&self) -> WorkingDirMode {
        WorkingDirMode::PerCall
    }

    fn begin_transaction(&mut self) -> Result<Transaction>;

    /// Stage `artifact` inside `txn`.
    ///
    /// `work_dir` is the directory relative descriptor references resolve
    /// against.
    fn queue(
        &mut self,
        txn: &mut Transaction,
        artifact: &CompiledArtifact,
        work_dir: &Path,
    ) -> Result<RunHandle>;

    fn commit(&mut self, txn: &mut Transaction) -> Result<()>;

    fn rollback(&mut self, txn: Transaction) -> Result<()>;
}

/// Submits compiled artifacts through a [`SchedulerBackend`].
///
/// A submission is all-or-nothing: on any failure the transaction is rolled
/// back and a [`DagSubmitError::Submission`] is returned. Nothing is retried.
pub struct SubmissionClient<B> {
    backend: B,
}

impl<B: SchedulerBackend> SubmissionClient<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_inner(self) -> B {
        self.backend
    }

    pub fn submit(&mut self, artifact: &CompiledArtifact) -> Result<RunHandle> {
        let handle = match self.backend.working_dir_mode() {
            WorkingDirMode::PerCall => self.transact(artifact, &artifact.directory)?,
            WorkingDirMode::ProcessWide => {
                let _cwd = WorkingDirGuard::enter(&artifact.directory)?;
                self.transact(artifact, Path::new("."))?
            }
        };

        info!(run = %handle, dir = ?artifact.directory, "scheduler accepted workflow");
        Ok(handle)
    }

    fn transact(&mut self, artifact: &CompiledArtifact, work_dir: &Path) -> Result<RunHandle> {
        let mut txn = self
            .backend
            .begin_transaction()
            .map_err(|e| as_submission("opening transaction", e))?;

        let handle = match self.backend.queue(&mut txn, artifact, work_dir) {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "queueing workflow failed; rolling back");
                return Err(self.abort(txn, as_submission("queueing workflow", e)));
            }
        };

        if let Err(e) = self.backend.commit(&mut txn) {
            error!(error = %e, "commit failed; rolling back");
            return Err(self.abort(txn, as_submission("committing transaction", e)));
        }

        Ok(handle)
    }

    /// Roll `txn` back, naming any runs left behind in the returned error.
    fn abort(&mut self, txn: Transaction, cause: DagSubmitError) -> DagSubmitError {
        let id = txn.id;
        let queued = txn.queued.clone();
        let Err(e) = self.backend.rollback(txn) else {
            return cause;
        };

        let runs: Vec<String> = queued.iter().map(ToString::to_string).collect();
        warn!(txn = id, runs = ?runs, error = %e, "rollback failed; runs must be removed by hand");
        DagSubmitError::Submission(format!(
            "{}; rollback failed for run(s) [{}]: {}",
            message(cause),
            runs.join(", "),
            message(e)
        ))
    }
}

fn as_submission(stage: &str, err: DagSubmitError) -> DagSubmitError {
    DagSubmitError::Submission(format!("{stage}: {}", message(err)))
}

fn message(err: DagSubmitError) -> String {
    match err {
        DagSubmitError::Submission(msg) => msg,
        other => other.to_string(),
    }
}
