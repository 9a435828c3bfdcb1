// src/submit/condor.rs

//! HTCondor binding built on the command-line tools.
//!
//! The tools have no native transaction, so one is emulated:
//! `queue` submits the DAGMan job on hold, `commit` releases it and
//! `rollback` removes it. Until commit nothing can start running.

use std::path::Path;
use std::process::{Command, Output};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::compile::CompiledArtifact;
use crate::errors::{DagSubmitError, Result};
use crate::submit::{SchedulerBackend, Transaction};
use crate::types::RunHandle;

static CLUSTER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"submitted to cluster (\d+)").expect("static regex"));

// `-terse` style job ids: `5.0` or `5.0 - 5.0` at the end of a line.
static TERSE_JOB_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?:^|\s)(\d+)\.\d+(?:\s*-\s*\d+\.\d+)?\s*$").expect("static regex")
});

/// Names (or paths) of the HTCondor tools to invoke.
///
/// Maps the `[scheduler]` config section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CondorTools {
    pub submit_dag: String,
    pub submit: String,
    pub release: String,
    pub remove: String,
}

impl Default for CondorTools {
    fn default() -> Self {
        Self {
            submit_dag: "condor_submit_dag".to_string(),
            submit: "condor_submit".to_string(),
            release: "condor_release".to_string(),
            remove: "condor_rm".to_string(),
        }
    }
}

/// [`SchedulerBackend`] that shells out to the HTCondor tools.
///
/// Every command gets its working directory through
/// [`Command::current_dir`], so the process working directory is never
/// touched.
#[derive(Debug, Default)]
pub struct CondorCli {
    tools: CondorTools,
    next_txn: u64,
}

impl CondorCli {
    pub fn new(tools: CondorTools) -> Self {
        Self { tools, next_txn: 0 }
    }

    fn run(&self, program: &str, args: &[&str], work_dir: Option<&Path>) -> Result<Output> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = work_dir {
            cmd.current_dir(dir);
        }

        debug!(program, ?args, dir = ?work_dir, "running scheduler tool");
        let output = cmd.output().map_err(|e| {
            DagSubmitError::Submission(format!("failed to run '{program}': {e}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DagSubmitError::Submission(format!(
                "'{program}' exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(output)
    }
}

impl SchedulerBackend for CondorCli {
    fn begin_transaction(&mut self) -> Result<Transaction> {
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
        let dag_file = artifact
            .descriptor_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                DagSubmitError::Submission(format!(
                    "artifact descriptor {:?} has no file name",
                    artifact.descriptor_path
                ))
            })?;

        // Generates `<dag>.condor.sub` for the DAGMan job without queueing it.
        self.run(
            &self.tools.submit_dag,
            &["-force", "-no_submit", dag_file.as_str()],
            Some(work_dir),
        )?;

        let submit_file = format!("{dag_file}.condor.sub");
        let output = self.run(
            &self.tools.submit,
            &["-append", "hold = True", submit_file.as_str()],
            Some(work_dir),
        )?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let Some(handle) = parse_cluster_id(&stdout) else {
            // The tool succeeded, so a held job probably exists that rollback
            // cannot name.
            warn!(txn = txn.id, stdout = %stdout.trim(), "no cluster id in submit output");
            return Err(DagSubmitError::Submission(format!(
                "'{}' succeeded but printed no cluster id; a held DAGMan job may have \
                 been queued, check condor_q and remove it with '{}'. Output was: {:?}",
                self.tools.submit, self.tools.remove, stdout
            )));
        };

        txn.queued.push(handle);
        debug!(txn = txn.id, run = %handle, "DAGMan job queued on hold");
        Ok(handle)
    }

    fn commit(&mut self, txn: &mut Transaction) -> Result<()> {
        for handle in &txn.queued {
            self.run(&self.tools.release, &[handle.to_string().as_str()], None)?;
            info!(txn = txn.id, run = %handle, "released DAGMan job");
        }
        Ok(())
    }

    fn rollback(&mut self, txn: Transaction) -> Result<()> {
        for handle in &txn.queued {
            self.run(&self.tools.remove, &[handle.to_string().as_str()], None)?;
            info!(txn = txn.id, run = %handle, "removed DAGMan job");
        }
        Ok(())
    }
}

/// Extract the cluster id from `condor_submit` output.
///
/// Accepts the regular summary (`"1 job(s) submitted to cluster 42."`) and
/// terse job ids (`"42.0"`, `"42.0 - 42.0"`).
pub fn parse_cluster_id(output: &str) -> Option<RunHandle> {
    CLUSTER_LINE
        .captures(output)
        .or_else(|| TERSE_JOB_ID.captures(output))
        .and_then(|c| c[1].parse::<u64>().ok())
        .map(RunHandle::new)
}
