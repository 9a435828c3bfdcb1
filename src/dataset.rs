// src/dataset.rs

//! Dataset discovery.
//!
//! A dataset is a directory directly below the base path. Its input files
//! live in a fixed subdirectory (the Delphes step by default) and are
//! selected by a file-name glob such as `*.root*`.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use tracing::{debug, info};

use crate::errors::{DagSubmitError, Result};
use crate::fs::FileSystem;

/// One discovered input file and its ordinal within the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub index: usize,
    pub path: PathBuf,
}

impl InputFile {
    /// File name without any extension, used by the `{stem}` naming token.
    ///
    /// `events.root.1` gives `events`.
    pub fn stem(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match name.split_once('.') {
            Some((stem, _)) => stem.to_string(),
            None => name,
        }
    }
}

/// Names of all dataset directories under `base_path`, sorted.
pub fn list_datasets(fs: &dyn FileSystem, base_path: &Path) -> Result<Vec<String>> {
    if !fs.is_dir(base_path) {
        return Ok(Vec::new());
    }

    let mut names: Vec<String> = fs
        .read_dir(base_path)?
        .into_iter()
        .filter(|p| fs.is_dir(p))
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    Ok(names)
}

/// Resolve `dataset` under `base_path` and list its input files.
///
/// Files are matched on their file name against `pattern` and ordered by
/// path, so the index assigned to each file is stable across invocations.
/// A dataset that exists but holds no matching files yields an empty list;
/// rejecting that is up to layer construction.
pub fn list_inputs(
    fs: &dyn FileSystem,
    dataset: &str,
    base_path: &Path,
    suffix: &str,
    pattern: &str,
) -> Result<Vec<InputFile>> {
    let valid = list_datasets(fs, base_path)?;
    if !valid.iter().any(|name| name == dataset) {
        return Err(DagSubmitError::NotFound {
            name: dataset.to_string(),
            valid,
        });
    }

    let matcher = compile_pattern(pattern)?;
    let input_dir = base_path.join(dataset).join(suffix);
    if !fs.is_dir(&input_dir) {
        debug!(dir = ?input_dir, "input directory missing; no files");
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = fs
        .read_dir(&input_dir)?
        .into_iter()
        .filter(|p| fs.is_file(p))
        .filter(|p| p.file_name().is_some_and(|n| matcher.is_match(n)))
        .collect();
    paths.sort();

    let inputs: Vec<InputFile> = paths
        .into_iter()
        .enumerate()
        .map(|(index, path)| InputFile { index, path })
        .collect();

    info!(dataset, count = inputs.len(), dir = ?input_dir, "discovered input files");
    Ok(inputs)
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| DagSubmitError::Config(format!("invalid input pattern '{pattern}': {e}")))
}
