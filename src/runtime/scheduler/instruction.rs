//! Wait instructions.
//!
//! A wait instruction is a stateful, one-shot predicate polled once per tick
//! by the task that owns it. `keep_waiting` returning `false` releases the
//! task; the task resumes advancing its sequence on the following tick.

use std::fmt;

/// Capability shared by every wait instruction.
pub trait WaitInstruction {
    /// Advance the instruction by `dt` seconds. Returns `true` to stay
    /// suspended.
    fn keep_waiting(
        &mut self,
        dt: f32,
    ) -> anyhow::Result<bool>;
}

/// Waits for a number of ticks.
///
/// The counter is decremented before it is tested, so the instruction
/// releases after `max(n, 1)` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitFrames {
    remaining: i64,
}

impl WaitFrames {
    pub fn new(frames: i64) -> Self {
        Self { remaining: frames }
    }

    /// Calls left before release, never below zero.
    #[inline]
    pub fn remaining(&self) -> i64 {
        self.remaining.max(0)
    }
}

impl WaitInstruction for WaitFrames {
    fn keep_waiting(
        &mut self,
        _dt: f32,
    ) -> anyhow::Result<bool> {
        self.remaining = self.remaining.saturating_sub(1);
        Ok(self.remaining > 0)
    }
}

/// Waits until the accumulated elapsed time reaches a duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitSeconds {
    duration: f32,
    elapsed: f32,
}

impl WaitSeconds {
    pub fn new(seconds: f32) -> Self {
        Self {
            duration: seconds,
            elapsed: 0.0,
        }
    }

    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

impl WaitInstruction for WaitSeconds {
    fn keep_waiting(
        &mut self,
        dt: f32,
    ) -> anyhow::Result<bool> {
        self.elapsed += dt;
        Ok(self.elapsed < self.duration)
    }
}

type ProgressFn = Box<dyn FnMut(f32) -> anyhow::Result<()>>;

/// Runs callbacks every tick for a duration.
///
/// Each call reports the normalized progress `t = clamp(elapsed / duration,
/// 0, 1)` to the progress callback and the raw `dt` to the delta callback,
/// and releases once `t` reaches 1. A non-positive duration performs exactly
/// one call with `t = 1`.
pub struct ActionOverTime {
    duration: f32,
    elapsed: f32,
    on_progress: Option<ProgressFn>,
    on_delta: Option<ProgressFn>,
}

impl fmt::Debug for ActionOverTime {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ActionOverTime")
            .field("duration", &self.duration)
            .field("elapsed", &self.elapsed)
            .field("on_progress", &self.on_progress.is_some())
            .field("on_delta", &self.on_delta.is_some())
            .finish()
    }
}

impl ActionOverTime {
    /// Create an action without callbacks; attach them with the builder
    /// methods.
    pub fn new(duration: f32) -> Self {
        Self {
            duration,
            elapsed: 0.0,
            on_progress: None,
            on_delta: None,
        }
    }

    /// Set the interpolated callback, receiving `t` in `[0, 1]`.
    pub fn on_progress(
        self,
        mut f: impl FnMut(f32) + 'static,
    ) -> Self {
        self.try_on_progress(move |t| {
            f(t);
            Ok(())
        })
    }

    /// Fallible form of [`on_progress`](Self::on_progress).
    pub fn try_on_progress(
        mut self,
        f: impl FnMut(f32) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Set the delta callback, receiving each tick's `dt`.
    pub fn on_delta(
        self,
        mut f: impl FnMut(f32) + 'static,
    ) -> Self {
        self.try_on_delta(move |dt| {
            f(dt);
            Ok(())
        })
    }

    /// Fallible form of [`on_delta`](Self::on_delta).
    pub fn try_on_delta(
        mut self,
        f: impl FnMut(f32) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.on_delta = Some(Box::new(f));
        self
    }

    #[inline]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Current normalized progress.
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }
}

impl WaitInstruction for ActionOverTime {
    fn keep_waiting(
        &mut self,
        dt: f32,
    ) -> anyhow::Result<bool> {
        self.elapsed += dt;
        let t = self.progress();
        if let Some(f) = self.on_progress.as_mut() {
            f(t)?;
        }
        if let Some(f) = self.on_delta.as_mut() {
            f(dt)?;
        }
        Ok(t < 1.0)
    }
}

/// Waits until a predicate holds. The predicate is evaluated once per call.
pub struct WaitUntil<F> {
    predicate: F,
}

impl<F> WaitUntil<F>
where
    F: FnMut() -> bool,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> WaitInstruction for WaitUntil<F>
where
    F: FnMut() -> bool,
{
    fn keep_waiting(
        &mut self,
        _dt: f32,
    ) -> anyhow::Result<bool> {
        Ok(!(self.predicate)())
    }
}

/// The closed set of instruction kinds a step can yield.
pub enum Instruction {
    Frames(WaitFrames),
    Seconds(WaitSeconds),
    OverTime(ActionOverTime),
    /// Producer-defined instruction.
    Custom(Box<dyn WaitInstruction>),
}

impl Instruction {
    /// Shorthand for [`WaitFrames::new`].
    pub fn frames(n: i64) -> Self {
        Instruction::Frames(WaitFrames::new(n))
    }

    /// Shorthand for [`WaitSeconds::new`].
    pub fn seconds(seconds: f32) -> Self {
        Instruction::Seconds(WaitSeconds::new(seconds))
    }

    /// Wait until `predicate` returns `true`.
    pub fn until(predicate: impl FnMut() -> bool + 'static) -> Self {
        Instruction::custom(WaitUntil::new(predicate))
    }

    pub fn custom(instruction: impl WaitInstruction + 'static) -> Self {
        Instruction::Custom(Box::new(instruction))
    }

    /// Short label for log output.
    pub fn kind(&self) -> &'static str {
        match self {
            Instruction::Frames(_) => "frames",
            Instruction::Seconds(_) => "seconds",
            Instruction::OverTime(_) => "over-time",
            Instruction::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Instruction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Instruction::Frames(w) => f.debug_tuple("Frames").field(w).finish(),
            Instruction::Seconds(w) => f.debug_tuple("Seconds").field(w).finish(),
            Instruction::OverTime(w) => f.debug_tuple("OverTime").field(w).finish(),
            Instruction::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl WaitInstruction for Instruction {
    fn keep_waiting(
        &mut self,
        dt: f32,
    ) -> anyhow::Result<bool> {
        match self {
            Instruction::Frames(w) => w.keep_waiting(dt),
            Instruction::Seconds(w) => w.keep_waiting(dt),
            Instruction::OverTime(w) => w.keep_waiting(dt),
            Instruction::Custom(w) => w.keep_waiting(dt),
        }
    }
}

impl From<WaitFrames> for Instruction {
    fn from(w: WaitFrames) -> Self {
        Instruction::Frames(w)
    }
}

impl From<WaitSeconds> for Instruction {
    fn from(w: WaitSeconds) -> Self {
        Instruction::Seconds(w)
    }
}

impl From<ActionOverTime> for Instruction {
    fn from(w: ActionOverTime) -> Self {
        Instruction::OverTime(w)
    }
}
