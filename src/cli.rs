// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

pub const DEFAULT_BASE_PATH: &str = "/collab/project/snowmass21/data/smmc/v0.1/r1/";

/// Command-line arguments for `dagsubmit`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dagsubmit",
    version,
    about = "Submit a per-file processing DAG for a dataset to HTCondor.",
    long_about = None
)]
pub struct CliArgs {
    /// Dataset directory name under the base path.
    #[arg(value_name = "DATASET")]
    pub dataset: String,

    /// Directory holding one sub-directory per dataset.
    #[arg(short = 'b', long, value_name = "PATH", default_value = DEFAULT_BASE_PATH)]
    pub base_path: PathBuf,

    /// Sub-directory of the dataset that holds the input files.
    #[arg(short = 'd', long, value_name = "SUFFIX", default_value = "delphesstep")]
    pub delphes_suffix: String,

    /// Build the DAG directory but do not submit it.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Follow the DAGMan event log until the workflow finishes.
    #[arg(short = 'w', long)]
    pub wait: bool,

    /// Only run the per-file layer, without the merge job.
    #[arg(long)]
    pub no_merge: bool,

    /// Path to the config file (TOML).
    ///
    /// Default: `Dagsubmit.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Where `<dataset>-dag/` is created. Defaults to the current directory.
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output_dir: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DAGSUBMIT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
