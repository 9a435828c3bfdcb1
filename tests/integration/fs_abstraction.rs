// tests/integration/fs_abstraction.rs

use std::path::{Path, PathBuf};

use dagsubmit::compile::{CompileOptions, compile};
use dagsubmit::dag::{MergeStage, WorkflowBuilder};
use dagsubmit::dataset::list_inputs;
use dagsubmit::errors::DagSubmitError;
use dagsubmit::fs::FileSystem;
use dagsubmit::fs::mock::MockFileSystem;
use dagsubmit_test_utils::builders::template;

fn dataset_tree() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/data/demo/delphesstep/run_b.root", b"b");
    fs.add_file("/data/demo/delphesstep/run_a.root.2", b"a");
    fs.add_file("/data/demo/delphesstep/index.html", b"<html/>");
    fs.add_dir("/data/ttbar/delphesstep");
    fs.add_file("/bin/process.sh", b"#!/bin/sh\n");
    fs.add_file("/bin/merge.sh", b"#!/bin/sh\n");
    fs
}

#[test]
fn test_mock_fs_discovery_and_compile() {
    let fs = dataset_tree();

    let inputs = list_inputs(&fs, "demo", Path::new("/data"), "delphesstep", "*.root*").unwrap();
    let names: Vec<_> = inputs.iter().map(|i| i.path.clone()).collect();
    assert_eq!(
        names,
        vec![
            PathBuf::from("/data/demo/delphesstep/run_a.root.2"),
            PathBuf::from("/data/demo/delphesstep/run_b.root"),
        ]
    );

    let graph = WorkflowBuilder::new("demo", template("process", "process.sh", "$(input_file)"))
        .merge(MergeStage::Enabled {
            template: template("merge", "merge.sh", "$(output_file)"),
            output_file: "demo-skim.root".to_string(),
        })
        .build(&inputs)
        .unwrap();

    let options = CompileOptions {
        source_dir: PathBuf::from("/bin"),
    };
    let artifact = compile(&fs, &graph, Path::new("/out/demo-dag"), &options).unwrap();

    let mut written = fs.files_under("/out/demo-dag");
    written.sort();
    assert_eq!(
        written,
        vec![
            PathBuf::from("/out/demo-dag/dagfile.dag"),
            PathBuf::from("/out/demo-dag/merge.sh"),
            PathBuf::from("/out/demo-dag/merge.sub"),
            PathBuf::from("/out/demo-dag/process.sh"),
            PathBuf::from("/out/demo-dag/process.sub"),
        ]
    );

    let dag = fs.read_to_string(&artifact.descriptor_path).unwrap();
    assert!(dag.contains(concat!(
        r#"VARS process:0 dataset="demo" index="0" "#,
        r#"input_file="/data/demo/delphesstep/run_a.root.2" output_file="demo-0.root""#
    )));
}

#[test]
fn test_mock_fs_recompile_drops_stale_files() {
    let fs = dataset_tree();
    fs.add_file("/out/demo-dag/old.sub", b"queue\n");

    let inputs = list_inputs(&fs, "demo", Path::new("/data"), "delphesstep", "*.root*").unwrap();
    let graph = WorkflowBuilder::new("demo", template("process", "process.sh", "$(input_file)"))
        .build(&inputs)
        .unwrap();
    let options = CompileOptions {
        source_dir: PathBuf::from("/bin"),
    };
    compile(&fs, &graph, Path::new("/out/demo-dag"), &options).unwrap();

    assert!(!fs.exists(Path::new("/out/demo-dag/old.sub")));
    assert!(fs.is_file(Path::new("/out/demo-dag/dagfile.dag")));
}

#[test]
fn test_mock_fs_missing_executable_keeps_previous_artifact() {
    let fs = dataset_tree();
    fs.add_file("/out/demo-dag/dagfile.dag", b"JOB old old.sub\n");

    let inputs = list_inputs(&fs, "demo", Path::new("/data"), "delphesstep", "*.root*").unwrap();
    let graph = WorkflowBuilder::new("demo", template("process", "process.sh", "$(input_file)"))
        .build(&inputs)
        .unwrap();
    let options = CompileOptions {
        source_dir: PathBuf::from("/nowhere"),
    };
    let result = compile(&fs, &graph, Path::new("/out/demo-dag"), &options);

    assert!(
        matches!(result, Err(DagSubmitError::Compilation(ref msg)) if msg.contains("not found"))
    );
    assert_eq!(
        fs.read_to_string(Path::new("/out/demo-dag/dagfile.dag")).unwrap(),
        "JOB old old.sub\n"
    );
    assert!(!fs.exists(Path::new("/out/demo-dag/process.sub")));
}

#[test]
fn test_mock_fs_rejects_executable_outside_artifact() {
    let fs = dataset_tree();
    fs.add_file("/tools/run.sh", b"#!/bin/sh\n");

    let inputs = list_inputs(&fs, "demo", Path::new("/data"), "delphesstep", "*.root*").unwrap();
    let graph =
        WorkflowBuilder::new("demo", template("process", "../tools/run.sh", "$(input_file)"))
            .build(&inputs)
            .unwrap();
    let options = CompileOptions {
        source_dir: PathBuf::from("/bin"),
    };
    let result = compile(&fs, &graph, Path::new("/out/demo-dag"), &options);

    assert!(matches!(result, Err(DagSubmitError::Compilation(ref msg)) if msg.contains("'..'")));
    assert!(!fs.exists(Path::new("/out/demo-dag")));
    assert!(!fs.exists(Path::new("/out/tools/run.sh")));
}
