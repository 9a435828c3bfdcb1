use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use dagsubmit::compile::CompiledArtifact;
use dagsubmit::errors::DagSubmitError;
use dagsubmit::submit::SubmissionClient;
use dagsubmit::types::RunHandle;
use dagsubmit_test_utils::fake_scheduler::FakeScheduler;
use dagsubmit_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn artifact() -> CompiledArtifact {
    let dir = PathBuf::from("/work/demo-dag");
    CompiledArtifact {
        descriptor_path: dir.join("dagfile.dag"),
        layer_descriptors: vec![dir.join("process.sub")],
        executables: vec![dir.join("process.sh")],
        node_count: 1,
        fingerprint: "f".repeat(64),
        directory: dir,
    }
}

#[test]
fn successful_submission_commits_once() -> TestResult {
    init_tracing();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut client = SubmissionClient::new(FakeScheduler::new(calls.clone()).cluster(1234));

    let run = client.submit(&artifact())?;

    assert_eq!(run, RunHandle::new(1234));
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["begin", "queue /work/demo-dag", "commit"]
    );
    Ok(())
}

#[test]
fn queue_failure_rolls_back() {
    init_tracing();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut client = SubmissionClient::new(FakeScheduler::new(calls.clone()).failing_queue());

    let err = client.submit(&artifact()).unwrap_err();

    match err {
        DagSubmitError::Submission(msg) => {
            assert!(msg.contains("queueing workflow"), "{msg}");
            assert!(msg.contains("queue refused"), "{msg}");
        }
        other => panic!("expected Submission error, got {other:?}"),
    }
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["begin", "queue /work/demo-dag", "rollback 0"]
    );
}

#[test]
fn commit_failure_rolls_back_queued_work() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut client = SubmissionClient::new(FakeScheduler::new(calls.clone()).failing_commit());

    let err = client.submit(&artifact()).unwrap_err();

    assert!(matches!(err, DagSubmitError::Submission(ref msg) if msg.contains("commit refused")));
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["begin", "queue /work/demo-dag", "commit", "rollback 1"]
    );
}

#[test]
fn failed_rollback_names_the_stranded_runs() {
    init_tracing();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let scheduler = FakeScheduler::new(calls.clone())
        .cluster(77)
        .failing_commit()
        .failing_rollback();
    let mut client = SubmissionClient::new(scheduler);

    let err = client.submit(&artifact()).unwrap_err();

    match err {
        DagSubmitError::Submission(msg) => {
            assert!(msg.contains("commit refused"), "{msg}");
            assert!(msg.contains("rollback failed for run(s) [77]"), "{msg}");
            assert!(msg.contains("rollback refused"), "{msg}");
        }
        other => panic!("expected Submission error, got {other:?}"),
    }
}
