//! Host tick source
//!
//! The per-frame clock that tasks register with. A [`TickSource`] owns the
//! subscriber registry; tasks only ever see a [`HostHandle`], a weak
//! reference that stops accepting subscriptions once the source is dropped.
//!
//! # Dispatch rules
//!
//! - Subscribers live at the start of a frame are invoked at most once, in
//!   registration order.
//! - Subscribers added during a frame are first invoked on the next frame.
//! - Subscribers removed during a frame are not invoked for the rest of it.
//! - No registry borrow is held while a callback runs, so callbacks may
//!   subscribe and unsubscribe freely.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::runtime::error::SchedulerError;
use crate::util::config::HostConfig;

/// Per-frame callback. Receives the frame's elapsed time in seconds.
pub type TickCallback = Box<dyn FnMut(f32) -> anyhow::Result<()>>;

/// Stable handle to a subscription. Ids are never reused, so a stale id
/// can never address a newer subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Get the inner value.
    #[inline]
    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Subscription capability a task needs from its host.
pub trait TickHost: Clone + 'static {
    /// Register a per-frame callback.
    fn subscribe(
        &self,
        callback: TickCallback,
    ) -> Result<SubscriptionId, SchedulerError>;

    /// Remove a subscription. Returns `false` when `id` is not live, which
    /// makes repeated calls no-ops.
    fn unsubscribe(
        &self,
        id: SubscriptionId,
    ) -> bool;
}

#[derive(Default)]
struct Registry {
    /// `None` while the callback is being dispatched.
    subscribers: IndexMap<SubscriptionId, Option<TickCallback>>,
    next_id: u64,
}

impl Registry {
    fn insert(
        &mut self,
        callback: TickCallback,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.insert(id, Some(callback));
        id
    }
}

/// A failure collected by [`TickSource::tick_isolated`].
#[derive(Debug)]
pub struct TickFailure {
    /// Subscriber whose callback failed.
    pub subscription: SubscriptionId,
    /// The producer error.
    pub error: anyhow::Error,
}

/// Summary of one dispatched frame.
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Elapsed time handed to subscribers after clamping.
    pub dt: f32,
    /// Callbacks invoked this frame.
    pub dispatched: usize,
    /// Failures collected in isolated mode.
    pub failures: Vec<TickFailure>,
}

impl FrameReport {
    /// `true` when no subscriber failed.
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Frame clock owning the subscriber registry.
pub struct TickSource {
    registry: Rc<RefCell<Registry>>,
    config: HostConfig,
    frame: Cell<u64>,
    dispatching: Cell<bool>,
}

impl fmt::Debug for TickSource {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("TickSource")
            .field("frame", &self.frame.get())
            .field("subscribers", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

impl TickSource {
    /// Create a tick source with default configuration.
    #[inline]
    pub fn new() -> Self {
        Self::with_config(HostConfig::default())
    }

    /// Create a tick source with custom configuration.
    pub fn with_config(config: HostConfig) -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry::default())),
            config,
            frame: Cell::new(0),
            dispatching: Cell::new(false),
        }
    }

    /// Weak handle for registering tasks.
    #[inline]
    pub fn handle(&self) -> HostHandle {
        HostHandle {
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Number of frames dispatched so far.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame.get()
    }

    /// Number of live subscribers.
    #[inline]
    pub fn len(&self) -> usize {
        self.registry.borrow().subscribers.len()
    }

    /// Check if no subscriber is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the configuration.
    #[inline]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Dispatch one frame, stopping at the first failing subscriber.
    ///
    /// The failing subscriber stays registered and the subscribers after it
    /// are not invoked this frame.
    pub fn tick(
        &self,
        dt: f32,
    ) -> anyhow::Result<FrameReport> {
        let (mut report, ids) = self.begin_frame(dt)?;
        let _guard = DispatchGuard(&self.dispatching);

        for id in ids {
            let Some(result) = self.dispatch(id, report.dt) else {
                continue;
            };
            report.dispatched += 1;
            if let Err(error) = result {
                return Err(error.context(format!(
                    "subscriber {} failed during frame {}",
                    id, report.frame
                )));
            }
        }

        trace!(frame = report.frame, dispatched = report.dispatched, "frame dispatched");
        Ok(report)
    }

    /// Dispatch one frame, isolating subscriber failures from each other.
    pub fn tick_isolated(
        &self,
        dt: f32,
    ) -> Result<FrameReport, SchedulerError> {
        let (mut report, ids) = self.begin_frame(dt)?;
        let _guard = DispatchGuard(&self.dispatching);

        for id in ids {
            let Some(result) = self.dispatch(id, report.dt) else {
                continue;
            };
            report.dispatched += 1;
            if let Err(error) = result {
                warn!(frame = report.frame, subscription = %id, "subscriber failed: {error:#}");
                report.failures.push(TickFailure {
                    subscription: id,
                    error,
                });
            }
        }

        trace!(
            frame = report.frame,
            dispatched = report.dispatched,
            failures = report.failures.len(),
            "frame dispatched"
        );
        Ok(report)
    }

    fn begin_frame(
        &self,
        dt: f32,
    ) -> Result<(FrameReport, SmallVec<[SubscriptionId; 32]>), SchedulerError> {
        if self.dispatching.get() {
            return Err(SchedulerError::ReentrantTick(self.frame.get()));
        }
        let frame = self.frame.get() + 1;
        self.frame.set(frame);

        let ids = self.registry.borrow().subscribers.keys().copied().collect();
        let report = FrameReport {
            frame,
            dt: self.effective_delta(dt),
            ..FrameReport::default()
        };
        self.dispatching.set(true);
        Ok((report, ids))
    }

    fn effective_delta(
        &self,
        dt: f32,
    ) -> f32 {
        let dt = if dt.is_nan() || dt < 0.0 { 0.0 } else { dt };
        match self.config.max_delta {
            Some(max) => dt.min(max),
            None => dt,
        }
    }

    /// Invoke one subscriber. Returns `None` when it was removed earlier in
    /// the frame.
    fn dispatch(
        &self,
        id: SubscriptionId,
        dt: f32,
    ) -> Option<anyhow::Result<()>> {
        let mut callback = self
            .registry
            .borrow_mut()
            .subscribers
            .get_mut(&id)
            .and_then(Option::take)?;

        let result = callback(dt);

        // Dropped outside the borrow: the callback may own task state.
        let _orphan = {
            let mut registry = self.registry.borrow_mut();
            match registry.subscribers.get_mut(&id) {
                Some(slot) => {
                    *slot = Some(callback);
                    None
                }
                None => Some(callback),
            }
        };
        Some(result)
    }
}

impl Default for TickSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the dispatching flag on scope exit, including early returns.
struct DispatchGuard<'a>(&'a Cell<bool>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Weak, cloneable reference to a [`TickSource`] registry.
#[derive(Clone)]
pub struct HostHandle {
    registry: Weak<RefCell<Registry>>,
}

impl fmt::Debug for HostHandle {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("HostHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl HostHandle {
    /// Check whether the tick source still exists.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.registry.strong_count() > 0
    }
}

impl TickHost for HostHandle {
    fn subscribe(
        &self,
        callback: TickCallback,
    ) -> Result<SubscriptionId, SchedulerError> {
        let registry = self
            .registry
            .upgrade()
            .ok_or(SchedulerError::HostUnavailable)?;
        let id = registry.borrow_mut().insert(callback);
        debug!(subscription = %id, "subscribed");
        Ok(id)
    }

    fn unsubscribe(
        &self,
        id: SubscriptionId,
    ) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let removed = registry.borrow_mut().subscribers.shift_remove(&id);
        match removed {
            Some(_) => {
                debug!(subscription = %id, "unsubscribed");
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests;
