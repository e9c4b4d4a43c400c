//! Frame-loop scenario integration tests
//!
//! Tests that drive the public API the way a simulation loop does.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tickflow::{start, start_instruction, Instruction, Script, Step, TaskState, TickSource};

#[test]
fn test_wait_then_set_flag() {
    let source = TickSource::new();
    let flag = Rc::new(Cell::new(false));
    let task = {
        let flag = flag.clone();
        start(&source.handle(), Script::new().wait_seconds(2.0).then(move || flag.set(true))).unwrap()
    };

    source.tick(1.0).unwrap();
    assert!(!flag.get());
    source.tick(1.0).unwrap();
    assert!(!flag.get());
    source.tick(0.0).unwrap();
    assert!(flag.get());
    assert!(task.is_finished());
}

#[test]
fn test_frame_count_task() {
    let source = TickSource::new();
    let task = start_instruction(&source.handle(), Instruction::frames(3)).unwrap();

    source.tick(0.016).unwrap();
    assert!(!task.is_finished());
    source.tick(0.016).unwrap();
    assert!(!task.is_finished());
    source.tick(0.016).unwrap();
    assert!(task.is_finished());
}

#[test]
fn test_cancelled_parent_leaves_subtask_running() {
    let source = TickSource::new();
    let child_finished = Rc::new(Cell::new(false));
    let parent_resumed = Rc::new(Cell::new(false));

    let parent = {
        let child_finished = child_finished.clone();
        let parent_resumed = parent_resumed.clone();
        start(
            &source.handle(),
            Script::new()
                .nested(
                    Script::new()
                        .wait_seconds(0.5)
                        .then(move || child_finished.set(true)),
                )
                .then(move || parent_resumed.set(true)),
        )
        .unwrap()
    };

    source.tick(0.1).unwrap();
    assert_eq!(parent.state(), TaskState::WaitingOnSubtask);
    let subtask = parent.subtask().unwrap();
    parent.cancel();
    assert!(parent.is_finished());
    assert!(!subtask.is_finished());

    let mut frames = 0;
    while !source.is_empty() && frames < 100 {
        source.tick(0.1).unwrap();
        frames += 1;
    }

    assert!(child_finished.get());
    assert_eq!(subtask.state(), TaskState::Finished);
    assert!(!parent_resumed.get());
    assert_eq!(parent.state(), TaskState::Cancelled);
}

#[test]
fn test_many_tasks_tick_once_per_frame() {
    let source = TickSource::new();
    let host = source.handle();
    let ticks = Rc::new(RefCell::new(vec![0usize; 50]));

    for i in 0..50 {
        let ticks = ticks.clone();
        start(
            &host,
            tickflow::from_fn(move || {
                ticks.borrow_mut()[i] += 1;
                Ok(Some(Step::Yield))
            }),
        )
        .unwrap();
    }

    for _ in 0..10 {
        let report = source.tick(0.016).unwrap();
        assert_eq!(report.dispatched, 50);
    }
    assert!(ticks.borrow().iter().all(|&n| n == 10));
}

#[test]
fn test_deeply_nested_sequences_complete_in_order() {
    let source = TickSource::new();
    let order = Rc::new(RefCell::new(Vec::new()));

    let mut script = {
        let order = order.clone();
        Script::new().then(move || order.borrow_mut().push(0))
    };
    for depth in 1..=4 {
        let order = order.clone();
        script = Script::new()
            .nested(script)
            .then(move || order.borrow_mut().push(depth));
    }
    let root = start(&source.handle(), script).unwrap();

    let mut frames = 0;
    while !root.is_finished() && frames < 100 {
        source.tick(0.016).unwrap();
        frames += 1;
    }

    assert_eq!(*order.borrow(), vec![0, 1, 2, 3, 4]);
    assert!(source.is_empty());
}
