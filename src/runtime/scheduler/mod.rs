//! Cooperative task scheduler
//!
//! Tasks are multi-step behaviours (delays, interpolated actions, ordered
//! sub-sequences) driven by a host's per-frame tick instead of by blocking
//! calls. Each tick a task does at most one of:
//!
//! 1. observe a cancellation request and become `Cancelled`;
//! 2. poll its active wait instruction;
//! 3. check whether its active sub-task reached a terminal state;
//! 4. advance its step sequence once.
//!
//! Clearing an instruction or sub-task and advancing the sequence never
//! happen in the same tick, which bounds the work a task does per frame.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use tickflow::{start, Script, TickSource};
//!
//! let source = TickSource::new();
//! let flag = Rc::new(Cell::new(false));
//! let task = {
//!     let flag = flag.clone();
//!     start(&source.handle(), Script::new().wait_seconds(2.0).then(move || flag.set(true)))
//!         .unwrap()
//! };
//!
//! source.tick(1.0).unwrap();
//! source.tick(1.0).unwrap();
//! assert!(!flag.get());
//! source.tick(0.0).unwrap();
//! assert!(flag.get());
//! assert!(task.is_finished());
//! ```

pub mod compose;
pub mod instruction;
pub mod sequence;
pub mod task;

pub use compose::{delayed, start_action_over_time, start_after_frames, start_delayed};
pub use instruction::{ActionOverTime, Instruction, WaitFrames, WaitInstruction, WaitSeconds, WaitUntil};
pub use sequence::{from_fn, from_steps, FromFn, Script, Sequence, Step, StepSequence, Steps};
pub use task::{start, start_instruction, start_named, TaskHandle, TaskId, TaskState};
