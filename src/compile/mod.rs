// src/compile/mod.rs

//! Materialise a [`WorkflowGraph`] as a DAGMan directory.
//!
//! The target directory is wiped and rebuilt on every call; stale files from
//! an earlier compilation never survive. Output is deterministic for a given
//! graph, so two compilations differ only in where they were written.

pub mod descriptor;

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use blake3::Hasher;
use tracing::{debug, info};

use crate::dag::WorkflowGraph;
use crate::errors::{DagSubmitError, Result};
use crate::fs::FileSystem;

pub use descriptor::DAG_FILE_NAME;

/// Where auxiliary files referenced by templates are copied from.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Directory that relative `executable` paths are resolved against.
    pub source_dir: PathBuf,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
        }
    }
}

/// The on-disk result of a compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    pub directory: PathBuf,
    /// The graph-level descriptor (`dagfile.dag`).
    pub descriptor_path: PathBuf,
    /// One submit file per layer, in topological order.
    pub layer_descriptors: Vec<PathBuf>,
    /// Executables copied into `directory`.
    pub executables: Vec<PathBuf>,
    /// Number of `JOB` entries in the DAG.
    pub node_count: usize,
    /// blake3 digest over every descriptor's relative name and contents.
    pub fingerprint: String,
}

impl CompiledArtifact {
    /// Event log DAGMan writes for its own job.
    pub fn dagman_log(&self) -> PathBuf {
        let mut name = self.descriptor_path.clone().into_os_string();
        name.push(".dagman.log");
        PathBuf::from(name)
    }
}

/// Compile `graph` into `target`.
///
/// Acyclicity is a precondition (enforced by [`WorkflowGraph::add_edge`]);
/// this function does not re-check it.
pub fn compile(
    fs: &dyn FileSystem,
    graph: &WorkflowGraph,
    target: &Path,
    options: &CompileOptions,
) -> Result<CompiledArtifact> {
    if graph.is_empty() {
        return Err(DagSubmitError::Compilation(
            "workflow graph has no layers".to_string(),
        ));
    }

    // Validate before touching the filesystem so a bad graph leaves any
    // previous artifact in place.
    for layer in graph.layers() {
        descriptor::check_bindings(layer)?;
    }
    let dag_text = descriptor::render_dag(graph)?;
    let executables = plan_executables(fs, graph, &options.source_dir)?;

    reset_dir(fs, target)?;

    let mut hasher = Hasher::new();
    let mut layer_descriptors = Vec::new();
    let mut node_count = 0;

    for layer in graph.topological_order() {
        let name = descriptor::submit_file_name(layer);
        let text = layer.template().to_submit_description();
        let path = target.join(&name);
        write_file(fs, &path, &text)?;
        fingerprint_entry(&mut hasher, &name, &text);

        debug!(layer = %layer.name(), path = ?path, "wrote submit description");
        layer_descriptors.push(path);
        node_count += layer.instances().len();
    }

    let descriptor_path = target.join(DAG_FILE_NAME);
    write_file(fs, &descriptor_path, &dag_text)?;
    fingerprint_entry(&mut hasher, DAG_FILE_NAME, &dag_text);

    let executables = copy_executables(fs, &executables, target)?;

    let fingerprint = hasher.finalize().to_hex().to_string();
    info!(
        dir = ?target,
        nodes = node_count,
        fingerprint = %fingerprint,
        "compiled workflow DAG"
    );

    Ok(CompiledArtifact {
        directory: target.to_path_buf(),
        descriptor_path,
        layer_descriptors,
        executables,
        node_count,
        fingerprint,
    })
}

fn reset_dir(fs: &dyn FileSystem, target: &Path) -> Result<()> {
    if fs.is_dir(target) {
        debug!(dir = ?target, "removing previous artifact");
        fs.remove_dir_all(target).map_err(compilation_error)?;
    } else if fs.exists(target) {
        return Err(DagSubmitError::Compilation(format!(
            "{:?} exists and is not a directory",
            target
        )));
    }
    fs.create_dir_all(target).map_err(compilation_error)
}

fn write_file(fs: &dyn FileSystem, path: &Path, text: &str) -> Result<()> {
    fs.write(path, text.as_bytes()).map_err(compilation_error)
}

fn fingerprint_entry(hasher: &mut Hasher, name: &str, text: &str) {
    hasher.update(name.as_bytes());
    hasher.update(&[0]);
    hasher.update(text.as_bytes());
    hasher.update(&[0]);
}

/// Resolve each relative `executable` against `source_dir`.
///
/// Absolute paths are left for the scheduler to resolve; executables built
/// from placeholders cannot be known until the scheduler expands them.
/// Returns `(source, path relative to the artifact)` pairs.
fn plan_executables(
    fs: &dyn FileSystem,
    graph: &WorkflowGraph,
    source_dir: &Path,
) -> Result<Vec<(PathBuf, PathBuf)>> {
    let relative: BTreeSet<&str> = graph
        .layers()
        .filter_map(|l| l.template().executable())
        .filter(|exe| !exe.contains("$(") && !Path::new(exe).is_absolute())
        .collect();

    let mut planned = Vec::with_capacity(relative.len());
    for exe in relative {
        let rel = Path::new(exe);
        // The copy must stay inside the artifact directory.
        if rel.components().any(|c| c == Component::ParentDir) {
            return Err(DagSubmitError::Compilation(format!(
                "executable {exe:?} must not contain '..'"
            )));
        }

        let from = source_dir.join(rel);
        if !fs.is_file(&from) {
            return Err(DagSubmitError::Compilation(format!(
                "executable {:?} not found",
                from
            )));
        }
        planned.push((from, rel.to_path_buf()));
    }
    Ok(planned)
}

/// Copy the planned executables next to the submit files.
fn copy_executables(
    fs: &dyn FileSystem,
    planned: &[(PathBuf, PathBuf)],
    target: &Path,
) -> Result<Vec<PathBuf>> {
    let mut copied = Vec::with_capacity(planned.len());
    for (from, rel) in planned {
        let to = target.join(rel);
        if let Some(parent) = to.parent() {
            fs.create_dir_all(parent).map_err(compilation_error)?;
        }
        fs.copy(from, &to).map_err(compilation_error)?;
        debug!(from = ?from, to = ?to, "copied executable");
        copied.push(to);
    }
    Ok(copied)
}

fn compilation_error(err: anyhow::Error) -> DagSubmitError {
    DagSubmitError::Compilation(format!("{err:#}"))
}
