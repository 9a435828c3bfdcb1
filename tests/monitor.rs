use std::error::Error;
use std::io::{ErrorKind, Write};
use std::time::Duration;

use dagsubmit::errors::DagSubmitError;
use dagsubmit::monitor::{ChannelSource, EventKind, EventMonitor, LogTail, WorkflowEvent};
use dagsubmit::types::{RunHandle, TerminalOutcome};
use dagsubmit_test_utils::{init_tracing, with_timeout};
use tokio::sync::mpsc;

type TestResult = Result<(), Box<dyn Error>>;

fn event(kind: EventKind, run: u64) -> WorkflowEvent {
    WorkflowEvent::new(kind, RunHandle::new(run))
}

#[tokio::test]
async fn terminal_event_of_other_run_is_ignored() -> TestResult {
    init_tracing();
    let (tx, rx) = mpsc::channel(16);
    for e in [
        event(EventKind::Submitted, 7),
        event(EventKind::Executing, 7),
        event(EventKind::Terminated, 9),
        event(EventKind::Terminated, 7),
        event(EventKind::Submitted, 8),
    ] {
        tx.send(e).await?;
    }

    let mut source = ChannelSource::new(rx);
    let monitor = EventMonitor::new();
    let outcome = with_timeout(monitor.await_terminal(RunHandle::new(7), &mut source)).await?;

    assert_eq!(outcome, TerminalOutcome::Success);
    assert_eq!(source.consumed(), 4);
    Ok(())
}

#[tokio::test]
async fn aborted_run_is_a_failure() -> TestResult {
    let (tx, rx) = mpsc::channel(4);
    tx.send(event(EventKind::Submitted, 3)).await?;
    tx.send(event(EventKind::Held, 3)).await?;
    tx.send(event(EventKind::Aborted, 3)).await?;

    let mut source = ChannelSource::new(rx);
    let monitor = EventMonitor::new();
    let outcome = with_timeout(monitor.await_terminal(RunHandle::new(3), &mut source)).await?;

    assert_eq!(outcome, TerminalOutcome::Failure);
    Ok(())
}

#[tokio::test]
async fn source_ending_early_is_an_io_error() {
    let (tx, rx) = mpsc::channel(4);
    tx.send(event(EventKind::Submitted, 5)).await.unwrap();
    drop(tx);

    let mut source = ChannelSource::new(rx);
    let err = with_timeout(EventMonitor::new().await_terminal(RunHandle::new(5), &mut source))
        .await
        .unwrap_err();

    match err {
        DagSubmitError::Io(e) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
        other => panic!("expected Io error, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_stops_waiting_and_closes_source() -> TestResult {
    let (tx, rx) = mpsc::channel(4);
    tx.send(event(EventKind::Executing, 11)).await?;

    let monitor = EventMonitor::new();
    let cancel = monitor.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let mut source = ChannelSource::new(rx);
    let outcome = with_timeout(monitor.await_terminal(RunHandle::new(11), &mut source)).await?;

    assert_eq!(outcome, TerminalOutcome::Cancelled);
    assert_eq!(source.consumed(), 1);
    // The receiving end is gone once the wait returns.
    assert!(tx.send(event(EventKind::Terminated, 11)).await.is_err());
    Ok(())
}

#[tokio::test]
async fn log_tail_follows_a_growing_log() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("dagfile.dag.dagman.log");

    let writer_path = path.clone();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let mut file = std::fs::File::create(&writer_path).unwrap();
        write!(
            file,
            "{}{}",
            "000 (017.000.000) 2026-10-16 09:00:00 Job submitted from host: <10.0.0.1:9618>\n...\n",
            "001 (017.000.000) 2026-10-16 09:00:02 Job exec"
        )
        .unwrap();
        file.flush().unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        write!(
            file,
            "{}{}{}",
            "uting on host: <10.0.0.2:9618>\n...\n",
            "005 (017.000.000) 2026-10-16 09:05:00 Job terminated.\n",
            "\t(1) Normal termination (return value 0)\n...\n"
        )
        .unwrap();
        file.flush().unwrap();
    });

    let mut tail = LogTail::with_fallback(&path, Duration::from_millis(50));
    let monitor = EventMonitor::new();
    let outcome = with_timeout(monitor.await_terminal(RunHandle::new(17), &mut tail)).await?;
    writer.await?;

    assert_eq!(outcome, TerminalOutcome::Success);
    Ok(())
}
