//! Scheduler error taxonomy.
//!
//! Malformed instruction arguments (negative frame counts, non-positive
//! durations) are not errors: instructions clamp them. Producer failures
//! (a step, an instruction callback or a composed action returning `Err`)
//! travel as [`anyhow::Error`] out of the tick that triggered them.

/// Errors raised by the scheduler itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// The host tick source has been torn down.
    #[error("host tick source is no longer available")]
    HostUnavailable,
    /// `tick` was called from inside a subscriber callback.
    #[error("tick source is already dispatching frame {0}")]
    ReentrantTick(u64),
}
