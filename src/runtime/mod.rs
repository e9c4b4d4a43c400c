//! Runtime system
//!
//! This module contains the host tick source and the cooperative scheduler
//! that runs on top of it.

pub mod error;
pub mod host;
pub mod scheduler;

pub use error::SchedulerError;
