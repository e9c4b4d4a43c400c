//! tickflow
//!
//! Cooperative, frame-driven task scheduling for real-time simulation loops.
//! Simulation code expresses multi-step behaviours (delays, interpolated
//! actions, ordered sub-sequences) as step sequences; a host tick source
//! advances every registered task once per frame without ever blocking the
//! update thread.
//!
//! # Example
//!
//! ```
//! use tickflow::{start, ActionOverTime, Script, TickSource};
//!
//! fn main() -> tickflow::Result<()> {
//!     let source = TickSource::new();
//!     let host = source.handle();
//!
//!     let fade = Script::new()
//!         .wait_seconds(0.5)
//!         .wait(ActionOverTime::new(1.0).on_progress(|t| println!("alpha = {t:.2}")))
//!         .then(|| println!("faded in"));
//!     let task = start(&host, fade)?;
//!
//!     while !task.is_finished() {
//!         source.tick(1.0 / 60.0)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The engine is single-threaded: tasks, handles and hosts are `!Send`.

#![doc(html_root_url = "https://docs.rs/tickflow")]
#![warn(rust_2018_idioms)]

pub mod runtime;
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};

pub use runtime::error::SchedulerError;
pub use runtime::host::{FrameReport, HostHandle, SubscriptionId, TickCallback, TickFailure, TickHost, TickSource};
pub use runtime::scheduler::{
    delayed, from_fn, from_steps, start, start_action_over_time, start_after_frames, start_delayed,
    start_instruction, start_named, ActionOverTime, Instruction, Script, Sequence, Step, StepSequence,
    TaskHandle, TaskId, TaskState, WaitFrames, WaitInstruction, WaitSeconds, WaitUntil,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "tickflow";
