//! Broadcast bus for source lifecycle events.
//!
//! [`EventBus`] is a thin wrapper around [`tokio::sync::broadcast`] used by
//! the pool and the poll loops to publish [`SourceEvent`]s without blocking.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; events are dropped
//!   when no receiver is attached.
//! - **Bounded capacity**: one ring buffer of recent events shared by all
//!   receivers; slow receivers observe `RecvError::Lagged(n)` and skip the
//!   `n` oldest items.
//! - **No persistence**: events published before `subscribe()` are not
//!   replayed.

use tokio::sync::broadcast;

use super::event::SourceEvent;

/// Broadcast channel for [`SourceEvent`]s.
///
/// Cheap to clone (the sender is `Arc`-backed). Multiple publishers may
/// publish concurrently; each receiver observes its own copy of every event
/// sent after it subscribed.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<SourceEvent>,
}

impl EventBus {
    /// Creates a bus with the given ring-buffer capacity (clamped to ≥ 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// Returns immediately; if nobody is listening the event is dropped.
    pub fn publish(&self, event: SourceEvent) {
        let _ = self.tx.send(event);
    }

    /// Creates an independent receiver observing subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<SourceEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SourceEventKind;

    #[tokio::test]
    async fn receivers_observe_published_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(SourceEvent::now(SourceEventKind::SourceStarted));
        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, SourceEventKind::SourceStarted);
    }

    #[tokio::test]
    async fn publish_without_receivers_is_a_noop() {
        let bus = EventBus::new(8);
        bus.publish(SourceEvent::now(SourceEventKind::SourceClosed));
    }
}
