//! Composition helpers built purely from tasks, sequences and instructions.

use super::instruction::{ActionOverTime, WaitFrames};
use super::sequence::Script;
use super::task::{start, start_instruction, TaskHandle};
use crate::runtime::error::SchedulerError;
use crate::runtime::host::TickHost;

/// Sequence that waits `seconds`, runs `action` once, then completes.
pub fn delayed<F>(
    seconds: f32,
    action: F,
) -> Script
where
    F: FnOnce() -> anyhow::Result<()> + 'static,
{
    Script::new().wait_seconds(seconds).try_then(action)
}

/// Start [`delayed`] as a task.
pub fn start_delayed<H, F>(
    host: &H,
    seconds: f32,
    action: F,
) -> Result<TaskHandle, SchedulerError>
where
    H: TickHost,
    F: FnOnce() -> anyhow::Result<()> + 'static,
{
    start(host, delayed(seconds, action))
}

/// Start a task that waits `frames` ticks, runs `action` once, then
/// completes.
pub fn start_after_frames<H, F>(
    host: &H,
    frames: i64,
    action: F,
) -> Result<TaskHandle, SchedulerError>
where
    H: TickHost,
    F: FnOnce() -> anyhow::Result<()> + 'static,
{
    start(host, Script::new().wait(WaitFrames::new(frames)).try_then(action))
}

/// Start a task that runs a single [`ActionOverTime`] and finishes in the
/// tick it reaches `t = 1`.
pub fn start_action_over_time<H>(
    host: &H,
    action: ActionOverTime,
) -> Result<TaskHandle, SchedulerError>
where
    H: TickHost,
{
    start_instruction(host, action)
}
