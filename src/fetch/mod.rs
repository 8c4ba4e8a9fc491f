//! Fetch engines: background poll loops over broker consumers.
//!
//! The [`FetchEngine`] trait is the seam between the pool and whatever runs
//! the actual poll loop; [`PollEngine`] is the crate's default task-per-
//! consumer implementation.

mod engine;
mod poll;

pub use engine::{BatchSink, FailureHook, FetchEngine, PollContext};
pub use poll::PollEngine;
