//! Lifecycle events emitted by the pool and the poll loops.
//!
//! [`SourceEventKind`] classifies what happened; [`SourceEvent`] carries the
//! slot index, an optional error text, a wall-clock timestamp, and a global
//! monotonic sequence number.
//!
//! ## Ordering
//! Events from one slot's loop are published in loop order, but delivery via
//! the broadcast bus interleaves slots. Use `seq` to restore a total order.
//!
//! ## Example
//! ```rust
//! use fetchpool::{SourceEvent, SourceEventKind};
//!
//! let ev = SourceEvent::now(SourceEventKind::PollFailed)
//!     .with_slot(1)
//!     .with_error("broker unavailable");
//!
//! assert_eq!(ev.kind, SourceEventKind::PollFailed);
//! assert_eq!(ev.slot, Some(1));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of source lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEventKind {
    /// The pool transitioned from idle to started.
    SourceStarted,

    /// A consumer was created for a slot (initial start or restart).
    ///
    /// Sets `slot`.
    ConsumerCreated,

    /// A slot's poll loop began running.
    ///
    /// Sets `slot`.
    PollLoopStarted,

    /// A non-empty batch was delivered to the subscribers.
    ///
    /// Sets `slot` and `records`.
    BatchDelivered,

    /// A poll attempt failed; the slot will be handed back for restart.
    ///
    /// Sets `slot` and `error`.
    PollFailed,

    /// A slot was rebuilt with a fresh consumer after a loop failure.
    ///
    /// Sets `slot`.
    SlotRestarted,

    /// An implicit auto-start triggered by `subscribe` failed.
    ///
    /// Sets `error`. Explicit `start()` callers get the error returned
    /// instead.
    StartFailed,

    /// The pool was closed; every fetcher registration was cancelled.
    SourceClosed,
}

/// One lifecycle event with metadata.
#[derive(Debug, Clone)]
pub struct SourceEvent {
    /// What happened.
    pub kind: SourceEventKind,
    /// Slot index, for per-consumer events.
    pub slot: Option<usize>,
    /// Number of delivered records, for [`SourceEventKind::BatchDelivered`].
    pub records: Option<usize>,
    /// Error text, for [`SourceEventKind::PollFailed`].
    pub error: Option<String>,
    /// Wall-clock timestamp taken at creation.
    pub at: SystemTime,
    /// Global monotonic sequence number.
    pub seq: u64,
}

impl SourceEvent {
    /// Creates an event stamped with the current time and the next sequence number.
    pub fn now(kind: SourceEventKind) -> Self {
        Self {
            kind,
            slot: None,
            records: None,
            error: None,
            at: SystemTime::now(),
            seq: EVENT_SEQ.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Attaches the slot index.
    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Attaches a delivered-record count.
    pub fn with_records(mut self, records: usize) -> Self {
        self.records = Some(records);
        self
    }

    /// Attaches an error description.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let first = SourceEvent::now(SourceEventKind::SourceStarted);
        let second = SourceEvent::now(SourceEventKind::SourceClosed);
        assert!(second.seq > first.seq);
    }

    #[test]
    fn builders_attach_metadata() {
        let ev = SourceEvent::now(SourceEventKind::BatchDelivered)
            .with_slot(3)
            .with_records(17);
        assert_eq!(ev.slot, Some(3));
        assert_eq!(ev.records, Some(17));
        assert_eq!(ev.error, None);
    }
}
