//! Error handling integration tests
//!
//! Tests for host teardown and producer failures.

use std::cell::Cell;
use std::rc::Rc;

use anyhow::bail;
use tickflow::{start, start_delayed, ActionOverTime, SchedulerError, Script, TickSource};

#[test]
fn test_start_after_host_teardown_fails() {
    let source = TickSource::new();
    let host = source.handle();
    drop(source);

    let result = start(&host, Script::new().wait_frames(1));
    assert!(matches!(result, Err(SchedulerError::HostUnavailable)));
}

#[test]
fn test_producer_failure_reaches_frame_loop() {
    let source = TickSource::new();
    let host = source.handle();
    start_delayed(&host, 0.0, || bail!("missing entity")).unwrap();

    source.tick(0.1).unwrap();
    let err = source.tick(0.1).unwrap_err();
    let chain = format!("{err:#}");
    assert!(chain.contains("missing entity"));
    assert!(chain.contains("frame 2"));
}

#[test]
fn test_instruction_callback_failure_isolated() {
    let source = TickSource::new();
    let host = source.handle();
    let healthy = Rc::new(Cell::new(false));

    start(
        &host,
        Script::new().wait(ActionOverTime::new(1.0).try_on_progress(|_| bail!("lost target"))),
    )
    .unwrap();
    {
        let healthy = healthy.clone();
        start(&host, Script::new().then(move || healthy.set(true))).unwrap();
    }

    let report = source.tick_isolated(0.1).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(format!("{:#}", report.failures[0].error).contains("lost target"));
    assert!(healthy.get());
    // The failing task is left registered.
    assert_eq!(source.len(), 1);
}
