//! Restart pacing policies.
//!
//! The default fetch engine waits between a failed poll and the slot-restart
//! signal. [`BackoffPolicy`] shapes that wait; [`JitterPolicy`] randomizes it
//! so that slots failing against the same broker do not restart in lockstep.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
