//! Task definitions for the scheduler.
//!
//! A task drives one step sequence from its host's per-frame callback. The
//! host registry owns the running state machine; producers
//! hold a [`TaskHandle`] that can only observe the task and request
//! cancellation.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, trace};

use super::instruction::{Instruction, WaitInstruction};
use super::sequence::{Sequence, Step, StepSequence};
use crate::runtime::error::SchedulerError;
use crate::runtime::host::{SubscriptionId, TickHost};

/// Unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub usize);

impl TaskId {
    /// Get the inner value.
    #[inline]
    pub fn inner(&self) -> usize {
        self.0
    }
}

impl From<usize> for TaskId {
    fn from(val: usize) -> Self {
        Self(val)
    }
}

impl From<TaskId> for usize {
    fn from(val: TaskId) -> Self {
        val.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Task({})", self.0)
    }
}

/// Process-wide task ID source.
static NEXT_TASK_ID: AtomicUsize = AtomicUsize::new(1);

impl TaskId {
    /// Generate the next task ID.
    #[inline]
    pub fn next() -> Self {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Task state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Nothing blocks the task; its sequence advances on the next tick.
    Running,
    /// Suspended on a wait instruction.
    WaitingOnInstruction,
    /// Suspended until a sub-task reaches a terminal state.
    WaitingOnSubtask,
    /// The sequence was exhausted.
    Finished,
    /// Cancellation was observed.
    Cancelled,
}

impl TaskState {
    /// `Finished` and `Cancelled` are absorbing.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Finished | TaskState::Cancelled)
    }
}

impl fmt::Display for TaskState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            TaskState::Running => "running",
            TaskState::WaitingOnInstruction => "waiting-on-instruction",
            TaskState::WaitingOnSubtask => "waiting-on-subtask",
            TaskState::Finished => "finished",
            TaskState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// State shared between a task's runner and its handles.
///
/// Written only by the runner, except for the sticky cancellation flag.
#[derive(Debug)]
pub(crate) struct TaskStatus {
    id: TaskId,
    name: Option<String>,
    state: Cell<TaskState>,
    cancel_requested: Cell<bool>,
    /// Taken exactly once when the task unregisters.
    registration: Cell<Option<SubscriptionId>>,
    /// Most recently started sub-task.
    subtask: RefCell<Option<Rc<TaskStatus>>>,
}

impl TaskStatus {
    fn new(name: Option<String>) -> Self {
        Self {
            id: TaskId::next(),
            name,
            state: Cell::new(TaskState::Running),
            cancel_requested: Cell::new(false),
            registration: Cell::new(None),
            subtask: RefCell::new(None),
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> TaskState {
        self.state.get()
    }
}

/// Producer-facing handle to a task.
///
/// Dropping every handle does not stop the task: the host registration keeps
/// it ticking until it reaches a terminal state.
#[derive(Clone)]
pub struct TaskHandle {
    status: Rc<TaskStatus>,
}

impl fmt::Debug for TaskHandle {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.status.id)
            .field("name", &self.status.name)
            .field("state", &self.state())
            .field("cancel_requested", &self.is_cancelled())
            .finish()
    }
}

impl TaskHandle {
    /// Get the task ID.
    #[inline]
    pub fn id(&self) -> TaskId {
        self.status.id
    }

    /// Get the task name, if one was given at start.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.status.name.as_deref()
    }

    /// Get the current state. A cancellation request is reflected here only
    /// once the task observes it on its next tick.
    #[inline]
    pub fn state(&self) -> TaskState {
        self.status.state()
    }

    /// Request cancellation. Idempotent; takes effect at the top of the
    /// task's next tick. Active sub-tasks are not cancelled; reach them
    /// through [`TaskHandle::subtask`].
    pub fn cancel(&self) {
        if self.status.cancel_requested.replace(true) {
            return;
        }
        debug!(task = %self.status.id, "cancellation requested");
    }

    /// Check whether cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.status.cancel_requested.get()
    }

    /// `true` once the task reached a terminal state or cancellation was
    /// requested.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal() || self.is_cancelled()
    }

    /// Handle to the sub-task this task most recently started, if any.
    ///
    /// The sub-task outlives a cancelled parent; this handle is how its
    /// owner observes or cancels it.
    pub fn subtask(&self) -> Option<TaskHandle> {
        self.status
            .subtask
            .borrow()
            .clone()
            .map(|status| TaskHandle { status })
    }
}

/// What currently blocks the task. Holding an instruction and a sub-task at
/// once is unrepresentable.
enum Suspension {
    None,
    Instruction(Instruction),
    /// Non-owning; the sub-task belongs to the host registry.
    Subtask(Weak<TaskStatus>),
}

enum Body {
    Sequence(Sequence),
    /// Finishes in the tick its instruction releases.
    Instruction,
}

/// The state machine ticked by the host.
struct TaskRunner<H: TickHost> {
    status: Rc<TaskStatus>,
    host: H,
    body: Body,
    suspension: Suspension,
}

impl<H: TickHost> TaskRunner<H> {
    fn tick(
        &mut self,
        dt: f32,
    ) -> anyhow::Result<()> {
        if self.status.state().is_terminal() {
            return Ok(());
        }
        if self.status.cancel_requested.get() {
            self.terminate(TaskState::Cancelled);
            return Ok(());
        }

        match &mut self.suspension {
            Suspension::Instruction(instruction) => {
                if !instruction.keep_waiting(dt)? {
                    self.release_instruction();
                }
                Ok(())
            }
            Suspension::Subtask(subtask) => {
                let done = subtask
                    .upgrade()
                    .map_or(true, |status| status.state().is_terminal());
                if done {
                    trace!(task = %self.status.id, "sub-task completed");
                    self.suspension = Suspension::None;
                    self.status.state.set(TaskState::Running);
                }
                Ok(())
            }
            Suspension::None => self.advance(dt),
        }
    }

    fn advance(
        &mut self,
        dt: f32,
    ) -> anyhow::Result<()> {
        let Body::Sequence(sequence) = &mut self.body else {
            self.terminate(TaskState::Finished);
            return Ok(());
        };

        match sequence.next_step()? {
            None => self.terminate(TaskState::Finished),
            Some(Step::Yield) => {
                trace!(task = %self.status.id, "yield");
            }
            Some(Step::Wait(instruction)) => {
                trace!(task = %self.status.id, kind = instruction.kind(), "waiting on instruction");
                self.suspension = Suspension::Instruction(instruction);
                self.status.state.set(TaskState::WaitingOnInstruction);
                // The adopting tick counts toward the wait.
                if let Suspension::Instruction(instruction) = &mut self.suspension {
                    if !instruction.keep_waiting(dt)? {
                        self.release_instruction();
                    }
                }
            }
            Some(Step::Nested(nested)) => {
                let child = spawn(&self.host, Body::Sequence(nested), Suspension::None, None)?;
                trace!(task = %self.status.id, subtask = %child.id(), "waiting on sub-task");
                self.suspension = Suspension::Subtask(Rc::downgrade(&child.status));
                self.status.subtask.replace(Some(child.status));
                self.status.state.set(TaskState::WaitingOnSubtask);
            }
        }
        Ok(())
    }

    fn release_instruction(&mut self) {
        self.suspension = Suspension::None;
        match self.body {
            Body::Instruction => self.terminate(TaskState::Finished),
            Body::Sequence(_) => self.status.state.set(TaskState::Running),
        }
    }

    fn terminate(
        &mut self,
        state: TaskState,
    ) {
        self.status.state.set(state);
        self.suspension = Suspension::None;
        if let Some(id) = self.status.registration.take() {
            self.host.unsubscribe(id);
        }
        debug!(task = %self.status.id, name = ?self.status.name, %state, "task terminated");
    }
}

/// Register a task with `host`. Step logic never runs here; the first
/// advancement happens on the first tick.
fn spawn<H: TickHost>(
    host: &H,
    body: Body,
    suspension: Suspension,
    name: Option<String>,
) -> Result<TaskHandle, SchedulerError> {
    let status = Rc::new(TaskStatus::new(name));
    if let Suspension::Instruction(_) = suspension {
        status.state.set(TaskState::WaitingOnInstruction);
    }
    let mut runner = TaskRunner {
        status: status.clone(),
        host: host.clone(),
        body,
        suspension,
    };
    let id = host.subscribe(Box::new(move |dt| runner.tick(dt)))?;
    status.registration.set(Some(id));
    debug!(task = %status.id, name = ?status.name, subscription = %id, "task started");
    Ok(TaskHandle { status })
}

/// Start a task running `sequence` on `host`.
///
/// Fails with [`SchedulerError::HostUnavailable`] when the host has been torn
/// down.
pub fn start<H, S>(
    host: &H,
    sequence: S,
) -> Result<TaskHandle, SchedulerError>
where
    H: TickHost,
    S: StepSequence + 'static,
{
    spawn(host, Body::Sequence(Box::new(sequence)), Suspension::None, None)
}

/// [`start`] with a name attached to the task's log output.
pub fn start_named<H, S>(
    host: &H,
    name: impl Into<String>,
    sequence: S,
) -> Result<TaskHandle, SchedulerError>
where
    H: TickHost,
    S: StepSequence + 'static,
{
    spawn(
        host,
        Body::Sequence(Box::new(sequence)),
        Suspension::None,
        Some(name.into()),
    )
}

/// Start a task that waits on `instruction` from its first tick and finishes
/// in the tick the instruction releases.
pub fn start_instruction<H>(
    host: &H,
    instruction: impl Into<Instruction>,
) -> Result<TaskHandle, SchedulerError>
where
    H: TickHost,
{
    spawn(
        host,
        Body::Instruction,
        Suspension::Instruction(instruction.into()),
        None,
    )
}
