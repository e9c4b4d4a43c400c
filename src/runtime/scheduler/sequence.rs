//! Step sequences.
//!
//! A task body is a lazy sequence of steps, advanced at most once per tick.
//! Each advancement produces one [`Step`] or reports exhaustion.

use std::collections::VecDeque;
use std::fmt;

use super::instruction::{Instruction, WaitFrames, WaitSeconds};

/// One advancement of a step sequence.
pub enum Step {
    /// Suspend for a single tick.
    Yield,
    /// Suspend until the instruction releases.
    Wait(Instruction),
    /// Run a nested sequence as an independent task and wait for it.
    Nested(Sequence),
}

impl Step {
    pub fn wait(instruction: impl Into<Instruction>) -> Self {
        Step::Wait(instruction.into())
    }

    pub fn nested(sequence: impl StepSequence + 'static) -> Self {
        Step::Nested(Box::new(sequence))
    }
}

impl fmt::Debug for Step {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Step::Yield => f.write_str("Yield"),
            Step::Wait(instruction) => f.debug_tuple("Wait").field(instruction).finish(),
            Step::Nested(_) => f.write_str("Nested(..)"),
        }
    }
}

/// Producer-authored task body.
pub trait StepSequence {
    /// Advance once. `Ok(None)` means the sequence is exhausted; `Err` is a
    /// producer failure and propagates out of the tick.
    fn next_step(&mut self) -> anyhow::Result<Option<Step>>;
}

/// Boxed, type-erased step sequence.
pub type Sequence = Box<dyn StepSequence>;

impl<S: StepSequence + ?Sized> StepSequence for Box<S> {
    fn next_step(&mut self) -> anyhow::Result<Option<Step>> {
        (**self).next_step()
    }
}

/// Sequence backed by a closure. See [`from_fn`].
pub struct FromFn<F>(F);

/// Build a sequence from a closure called once per advancement.
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: FnMut() -> anyhow::Result<Option<Step>>,
{
    FromFn(f)
}

impl<F> StepSequence for FromFn<F>
where
    F: FnMut() -> anyhow::Result<Option<Step>>,
{
    fn next_step(&mut self) -> anyhow::Result<Option<Step>> {
        (self.0)()
    }
}

/// Sequence backed by an iterator. See [`from_steps`].
pub struct Steps<I>(I);

/// Build a sequence from an iterator of steps. The iterator is pulled
/// lazily, one item per advancement.
pub fn from_steps<I>(steps: I) -> Steps<I::IntoIter>
where
    I: IntoIterator<Item = Step>,
{
    Steps(steps.into_iter())
}

impl<I> StepSequence for Steps<I>
where
    I: Iterator<Item = Step>,
{
    fn next_step(&mut self) -> anyhow::Result<Option<Step>> {
        Ok(self.0.next())
    }
}

type Action = Box<dyn FnOnce() -> anyhow::Result<()>>;

enum Stage {
    Step(Step),
    Action(Action),
}

/// Linear script of waits and actions.
///
/// One advancement runs every pending action up to the next yielding stage,
/// then yields it:
///
/// ```
/// use tickflow::{Instruction, Script};
///
/// let script = Script::new()
///     .wait_seconds(2.0)
///     .then(|| println!("two seconds later"))
///     .wait(Instruction::frames(3))
///     .then(|| println!("three frames after that"));
/// assert_eq!(script.len(), 4);
/// ```
#[derive(Default)]
pub struct Script {
    stages: VecDeque<Stage>,
}

impl fmt::Debug for Script {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Script")
            .field("stages", &self.stages.len())
            .finish()
    }
}

impl Script {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wait(
        mut self,
        instruction: impl Into<Instruction>,
    ) -> Self {
        self.stages.push_back(Stage::Step(Step::wait(instruction)));
        self
    }

    pub fn wait_frames(
        self,
        frames: i64,
    ) -> Self {
        self.wait(WaitFrames::new(frames))
    }

    pub fn wait_seconds(
        self,
        seconds: f32,
    ) -> Self {
        self.wait(WaitSeconds::new(seconds))
    }

    /// Suspend for one tick.
    pub fn yield_frame(mut self) -> Self {
        self.stages.push_back(Stage::Step(Step::Yield));
        self
    }

    /// Run `sequence` as a sub-task and wait for it to reach a terminal state.
    pub fn nested(
        mut self,
        sequence: impl StepSequence + 'static,
    ) -> Self {
        self.stages.push_back(Stage::Step(Step::nested(sequence)));
        self
    }

    pub fn then(
        self,
        action: impl FnOnce() + 'static,
    ) -> Self {
        self.try_then(move || {
            action();
            Ok(())
        })
    }

    /// Fallible action; an `Err` propagates out of the tick that runs it.
    pub fn try_then(
        mut self,
        action: impl FnOnce() -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.stages.push_back(Stage::Action(Box::new(action)));
        self
    }

    /// Stages not yet consumed.
    #[inline]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl StepSequence for Script {
    fn next_step(&mut self) -> anyhow::Result<Option<Step>> {
        while let Some(stage) = self.stages.pop_front() {
            match stage {
                Stage::Action(action) => action()?,
                Stage::Step(step) => return Ok(Some(step)),
            }
        }
        Ok(None)
    }
}
