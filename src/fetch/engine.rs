//! Fetch-engine contract.
//!
//! A [`FetchEngine`] takes ownership of one subscribed consumer and runs its
//! poll loop as a background task, delivering converted batches through a
//! [`BatchSink`]. The pool calls [`FetchEngine::poll`] exactly once per slot
//! (and once more per restart) and keeps the returned
//! [`Registration`](crate::Registration) so the loop can be torn down exactly
//! once.

use std::sync::atomic::AtomicU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::consumer::{BrokerConsumer, RecordConverter, TokenStore};
use crate::error::BrokerError;
use crate::events::EventBus;
use crate::registration::Registration;

/// Receives every non-empty converted batch from one slot's poll loop.
///
/// [`ProcessorSet`](crate::ProcessorSet) implements this by fanning the batch
/// out to all current subscribers.
#[async_trait]
pub trait BatchSink<M>: Send + Sync + 'static {
    /// Delivers one batch, in record order.
    async fn deliver(&self, batch: Vec<M>);
}

/// Hook invoked when a slot's poll loop gives up on its consumer.
///
/// The pool uses it to rebuild the slot with a fresh consumer.
pub type FailureHook = Arc<dyn Fn(BrokerError) + Send + Sync>;

/// Everything a poll loop needs besides the consumer itself.
///
/// Built by the pool per slot; the engine moves it into the background task.
pub struct PollContext<R, M> {
    /// Slot index the loop is polling for.
    pub slot: usize,
    /// How long one broker poll may wait for records.
    pub poll_timeout: Duration,
    /// Consecutive poll failures for this slot, shared across restarts.
    ///
    /// The engine resets it on a successful poll and bumps it on failure, so
    /// backoff grows over an outage and recovers afterwards.
    pub failure_count: Arc<AtomicU32>,
    /// Converts raw records into messages; `None` results are skipped.
    pub converter: Arc<dyn RecordConverter<R, M>>,
    /// Progress bookkeeping, notified after each delivered batch.
    pub token_store: Arc<dyn TokenStore>,
    /// Delivery target for converted batches.
    pub sink: Arc<dyn BatchSink<M>>,
    /// Called when the loop abandons its consumer; hands the slot back.
    pub on_failure: FailureHook,
    /// Lifecycle event bus shared with the pool.
    pub bus: EventBus,
}

/// Runs the asynchronous poll loop for one consumer.
///
/// Contract:
/// - the returned registration's `cancel()` stops further dispatch from this
///   loop and frees the consumer; it is idempotent and safe concurrently
///   with an in-flight poll iteration (one already-handed-off batch may still
///   arrive);
/// - on a broker error the engine invokes `ctx.on_failure` once, after any
///   internal pacing, and lets the loop end — retrying with a fresh consumer
///   is the pool's side of the deal;
/// - batch order from one consumer is preserved through `ctx.sink`.
pub trait FetchEngine<C, M>: Send + Sync + 'static
where
    C: BrokerConsumer,
    M: Send + Sync + 'static,
{
    /// Starts polling `consumer` in the background; never blocks the caller.
    fn poll(&self, consumer: C, ctx: PollContext<C::Record, M>) -> Registration;
}
