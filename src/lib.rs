// src/lib.rs

pub mod cli;
pub mod compile;
pub mod config;
pub mod dag;
pub mod dataset;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod monitor;
pub mod submit;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::compile::{CompileOptions, CompiledArtifact, compile};
use crate::config::{ConfigFile, load_or_default};
use crate::dag::{MergeStage, WorkflowBuilder};
use crate::dataset::list_inputs;
use crate::errors::{DagSubmitError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::monitor::{EventMonitor, LogTail};
use crate::submit::{CondorCli, SchedulerBackend, SubmissionClient};
use crate::types::{RunHandle, TerminalOutcome};

/// What a run of the tool ended with.
#[derive(Debug)]
pub enum RunSummary {
    /// The dataset does not exist under the base path.
    DatasetNotFound { dataset: String, valid: Vec<String> },
    /// The DAG directory was written; nothing was submitted.
    DryRun { artifact: CompiledArtifact },
    /// The DAG was accepted by the scheduler.
    Submitted {
        run: RunHandle,
        artifact: CompiledArtifact,
    },
    /// The DAG was submitted and followed to the end.
    Completed {
        run: RunHandle,
        outcome: TerminalOutcome,
    },
}

impl RunSummary {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunSummary::DatasetNotFound { .. } => 1,
            RunSummary::DryRun { .. } | RunSummary::Submitted { .. } => 0,
            RunSummary::Completed { outcome, .. } => match outcome {
                TerminalOutcome::Success => 0,
                TerminalOutcome::Failure => 1,
                TerminalOutcome::Cancelled => 130,
            },
        }
    }
}

/// High-level entry point used by `main.rs`.
///
/// Loads the config, then runs against the real filesystem and the
/// HTCondor command-line tools.
pub async fn run(args: CliArgs) -> anyhow::Result<RunSummary> {
    let cfg = load_or_default(args.config.as_deref())?;
    let backend = CondorCli::new(cfg.scheduler.clone());
    let summary = run_with(&args, &cfg, &RealFileSystem, backend).await?;
    Ok(summary)
}

/// Enumerate, build, compile and (unless dry run) submit one dataset.
pub async fn run_with<B: SchedulerBackend + Send + 'static>(
    args: &CliArgs,
    cfg: &ConfigFile,
    fs: &dyn FileSystem,
    backend: B,
) -> Result<RunSummary> {
    let inputs = match list_inputs(
        fs,
        &args.dataset,
        &args.base_path,
        &args.delphes_suffix,
        &cfg.workflow.input_pattern,
    ) {
        Ok(inputs) => inputs,
        Err(DagSubmitError::NotFound { name, valid }) => {
            println!(
                "Must provide a valid dataset in {}. Select from: {}.",
                args.base_path.display(),
                valid.join(", ")
            );
            return Ok(RunSummary::DatasetNotFound {
                dataset: name,
                valid,
            });
        }
        Err(e) => return Err(e),
    };
    println!("{} files found in {}.", inputs.len(), args.dataset);

    let merge = if cfg.workflow.merge && !args.no_merge {
        MergeStage::Enabled {
            template: Arc::clone(&cfg.merge),
            output_file: cfg.workflow.merge_output_for(&args.dataset),
        }
    } else {
        MergeStage::Disabled
    };

    let graph = WorkflowBuilder::new(args.dataset.as_str(), Arc::clone(&cfg.process))
        .naming(cfg.workflow.naming())
        .merge(merge)
        .build(&inputs)?;

    let target = dag_directory(args)?;
    let options = CompileOptions {
        source_dir: cfg.workflow.executables_dir.clone(),
    };
    let artifact = compile(fs, &graph, &target, &options)?;

    println!("DAG directory: {}", artifact.directory.display());
    println!("DAG description file: {}", artifact.descriptor_path.display());
    debug!(fingerprint = %artifact.fingerprint, nodes = artifact.node_count, "DAG compiled");

    if args.dry_run {
        println!("DAG fingerprint: {}", artifact.fingerprint);
        println!("Dry run mode. No jobs were submitted.");
        return Ok(RunSummary::DryRun { artifact });
    }

    let run = submit_blocking(backend, artifact.clone()).await?;
    println!("DAGMan job cluster is {run}");

    if !args.wait {
        return Ok(RunSummary::Submitted { run, artifact });
    }

    let log = artifact.dagman_log();
    println!("DAG job log file is {}", log.display());

    match wait_for(run, &log).await {
        Ok(outcome) => {
            info!(run = %run, ?outcome, "workflow finished");
            Ok(RunSummary::Completed { run, outcome })
        }
        Err(e) => {
            // The submission itself stands; only the wait failed.
            error!(run = %run, error = %e, "waiting for workflow failed");
            eprintln!("DAGMan job cluster {run} was submitted, but following it failed.");
            Err(e)
        }
    }
}

/// Run the (blocking) scheduler hand-off on tokio's blocking pool.
async fn submit_blocking<B: SchedulerBackend + Send + 'static>(
    backend: B,
    artifact: CompiledArtifact,
) -> Result<RunHandle> {
    tokio::task::spawn_blocking(move || SubmissionClient::new(backend).submit(&artifact))
        .await
        .map_err(|e| DagSubmitError::Submission(format!("submission task failed: {e}")))?
}

/// Follow the DAGMan log of `run` until it terminates or Ctrl-C is pressed.
async fn wait_for(run: RunHandle, log: &Path) -> Result<TerminalOutcome> {
    let monitor = EventMonitor::new();

    // Ctrl-C → stop waiting; the workflow itself keeps running.
    let cancel = monitor.cancel_handle();
    let ctrl_c = tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        cancel.cancel();
    });

    let mut tail = LogTail::open(log);
    let outcome = monitor.await_terminal(run, &mut tail).await;
    ctrl_c.abort();
    outcome
}

/// `<output-dir>/<dataset>-dag`, made absolute against the current directory.
fn dag_directory(args: &CliArgs) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    let base = match &args.output_dir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => cwd.join(dir),
        None => cwd,
    };
    Ok(base.join(format!("{}-dag", args.dataset)))
}
