#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub use dagsubmit_test_utils::init_tracing;

/// A dataset tree on disk:
///
/// ```text
/// <root>/data/<dataset>/delphesstep/events_<i>.root
/// <root>/bin/process.sh, merge.sh
/// <root>/out/
/// ```
pub struct DatasetFixture {
    pub root: TempDir,
}

impl DatasetFixture {
    pub fn new(dataset: &str, files: usize) -> Self {
        let root = tempfile::tempdir().unwrap();
        let inputs = root.path().join("data").join(dataset).join("delphesstep");
        fs::create_dir_all(&inputs).unwrap();
        for i in 0..files {
            fs::write(inputs.join(format!("events_{i}.root")), b"root").unwrap();
        }

        let bin = root.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join("process.sh"), b"#!/bin/sh\necho process \"$@\"\n").unwrap();
        fs::write(bin.join("merge.sh"), b"#!/bin/sh\necho merge \"$@\"\n").unwrap();

        fs::create_dir_all(root.path().join("out")).unwrap();
        Self { root }
    }

    pub fn add_dataset(&self, name: &str) {
        fs::create_dir_all(self.base().join(name).join("delphesstep")).unwrap();
    }

    pub fn base(&self) -> PathBuf {
        self.root.path().join("data")
    }

    pub fn bin(&self) -> PathBuf {
        self.root.path().join("bin")
    }

    pub fn out(&self) -> PathBuf {
        self.root.path().join("out")
    }
}

/// Lines of `path` starting with `prefix`.
pub fn lines_starting_with(path: &Path, prefix: &str) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| l.starts_with(prefix))
        .map(str::to_string)
        .collect()
}
