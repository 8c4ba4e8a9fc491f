//! Subscription registry: identity-keyed batch processors with isolated fan-out.
//!
//! [`ProcessorSet`] holds the event processors currently subscribed to the
//! source. Membership is keyed by reference identity (`Arc::ptr_eq`), so
//! re-subscribing the same instance is a no-op, while two separate instances
//! of the same type are two delivery targets.
//!
//! Dispatch walks a snapshot of the set and awaits each processor in turn,
//! which preserves the batch's internal record order per slot. A panicking
//! processor is caught and logged; it never prevents delivery to the others
//! and never unwinds into the poll loop.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::FutureExt;
use tracing::warn;

use crate::fetch::BatchSink;

/// A subscribed event-processor callback.
///
/// Receives every batch the pool's consumers deliver, in batch order for any
/// one slot. Implementations should be quick or buffer internally; delivery
/// for a slot waits until `on_batch` returns.
#[async_trait]
pub trait BatchProcessor<M>: Send + Sync + 'static {
    /// Handles one batch of messages.
    async fn on_batch(&self, batch: &[M]);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// The set of currently-subscribed processors.
///
/// Owned by the pool; the delivery path shares it read-only through
/// [`BatchSink`].
pub struct ProcessorSet<M> {
    processors: Mutex<Vec<Arc<dyn BatchProcessor<M>>>>,
}

impl<M> ProcessorSet<M> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            processors: Mutex::new(Vec::new()),
        }
    }

    /// Adds `processor` unless the same instance is already present.
    ///
    /// Returns whether the set changed.
    pub fn insert(&self, processor: Arc<dyn BatchProcessor<M>>) -> bool {
        let mut processors = self.lock();
        if processors.iter().any(|p| Arc::ptr_eq(p, &processor)) {
            return false;
        }
        processors.push(processor);
        true
    }

    /// Removes `processor` by identity.
    ///
    /// Returns whether it was present.
    pub fn remove(&self, processor: &Arc<dyn BatchProcessor<M>>) -> bool {
        let mut processors = self.lock();
        let before = processors.len();
        processors.retain(|p| !Arc::ptr_eq(p, processor));
        processors.len() != before
    }

    /// Removes every processor.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of subscribed processors.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn BatchProcessor<M>>>> {
        self.processors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn snapshot(&self) -> Vec<Arc<dyn BatchProcessor<M>>> {
        self.lock().clone()
    }
}

impl<M> Default for ProcessorSet<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> ProcessorSet<M>
where
    M: Send + Sync + 'static,
{
    /// Delivers `batch` to every currently-subscribed processor.
    ///
    /// Processors are awaited sequentially against a snapshot taken at call
    /// time; panics are isolated per processor.
    pub async fn dispatch(&self, batch: &[M]) {
        for processor in self.snapshot() {
            let delivery = processor.on_batch(batch);
            if let Err(panic) = std::panic::AssertUnwindSafe(delivery).catch_unwind().await {
                warn!(
                    processor = processor.name(),
                    ?panic,
                    "batch processor panicked; continuing with remaining processors"
                );
            }
        }
    }
}

#[async_trait]
impl<M> BatchSink<M> for ProcessorSet<M>
where
    M: Send + Sync + 'static,
{
    async fn deliver(&self, batch: Vec<M>) {
        self.dispatch(&batch).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        seen: Mutex<Vec<Vec<u64>>>,
    }

    impl Recorder {
        fn arc() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl BatchProcessor<u64> for Recorder {
        async fn on_batch(&self, batch: &[u64]) {
            self.seen.lock().unwrap().push(batch.to_vec());
        }
    }

    struct Exploder;

    #[async_trait]
    impl BatchProcessor<u64> for Exploder {
        async fn on_batch(&self, _batch: &[u64]) {
            panic!("boom");
        }
    }

    #[test]
    fn insert_is_idempotent_by_identity() {
        let set = ProcessorSet::<u64>::new();
        let recorder = Recorder::arc();
        let as_processor: Arc<dyn BatchProcessor<u64>> = recorder.clone();

        assert!(set.insert(as_processor.clone()));
        assert!(!set.insert(as_processor.clone()));
        assert_eq!(set.len(), 1);

        // A distinct instance of the same type is a distinct subscriber.
        let other: Arc<dyn BatchProcessor<u64>> = Recorder::arc();
        assert!(set.insert(other));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn remove_reports_presence() {
        let set = ProcessorSet::<u64>::new();
        let processor: Arc<dyn BatchProcessor<u64>> = Recorder::arc();
        set.insert(processor.clone());

        assert!(set.remove(&processor));
        assert!(!set.remove(&processor));
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn dispatch_reaches_every_processor_in_batch_order() {
        let set = ProcessorSet::<u64>::new();
        let first = Recorder::arc();
        let second = Recorder::arc();
        set.insert(first.clone());
        set.insert(second.clone());

        set.dispatch(&[1, 2, 3]).await;
        set.dispatch(&[4]).await;

        let expected = vec![vec![1, 2, 3], vec![4]];
        assert_eq!(*first.seen.lock().unwrap(), expected);
        assert_eq!(*second.seen.lock().unwrap(), expected);
    }

    #[tokio::test]
    async fn panicking_processor_does_not_block_the_rest() {
        let set = ProcessorSet::<u64>::new();
        let survivor = Recorder::arc();
        set.insert(Arc::new(Exploder));
        set.insert(survivor.clone());

        set.dispatch(&[9]).await;

        assert_eq!(*survivor.seen.lock().unwrap(), vec![vec![9]]);
    }
}
