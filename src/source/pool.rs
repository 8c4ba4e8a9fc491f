//! The consumer pool: subscribable source over N supervised poll loops.
//!
//! [`SubscribableSource`] orchestrates the whole lifecycle:
//!
//! ```text
//! subscribe(processor) ──► ProcessorSet (identity-keyed)
//!        │ (auto-start, first subscriber)
//!        ▼
//! start() ── per slot 0..consumer_count ──► factory.create_consumer(group_id)
//!        │                                  consumer.subscribe(selector)   (exactly once)
//!        │                                  engine.poll(consumer, ctx) ──► Registration
//!        ▼                                  registrations[slot] = reg      (replace, never append)
//! poll loops ── batches ──► ProcessorSet::dispatch ──► every subscriber
//!        │
//!        │ broker error ──► on_failure(slot) ──► fresh consumer, map entry replaced
//!        ▼
//! close() ──► cancel every registration, clear map, clear subscribers
//! ```
//!
//! ## State machine
//! Idle → Started → Closed, with close idempotent and a no-op on a pool that
//! never started. A closed pool may be started again; the map-size invariant
//! (0 / consumer_count / 0) holds across every transition and across any
//! number of slot restarts in between.
//!
//! ## Locking
//! One `std::sync::Mutex` guards the started flag and the registration map.
//! It is held only across bookkeeping and the synchronous collaborator calls
//! (factory, subscribe, engine spawn); never across an `.await`. Cancelling a
//! registration takes no pool lock, so close never deadlocks with a loop that
//! is concurrently handing its slot back.

use std::collections::HashMap;
use std::sync::atomic::AtomicU32;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::consumer::{BrokerConsumer, ConsumerFactory, RecordConverter, TokenStore};
use crate::error::BrokerError;
use crate::events::{EventBus, SourceEvent, SourceEventKind};
use crate::fetch::{BatchSink, FailureHook, FetchEngine, PollContext};
use crate::registration::Registration;
use crate::source::processors::{BatchProcessor, ProcessorSet};
use crate::topics::TopicSelector;

/// Record type produced by a factory's consumers.
pub type RecordOf<F> = <<F as ConsumerFactory>::Consumer as BrokerConsumer>::Record;

/// Validated, immutable pool settings produced by the builder.
pub(crate) struct PoolSettings {
    pub group_id: String,
    pub selector: TopicSelector,
    pub consumer_count: usize,
    pub auto_start: bool,
    pub poll_timeout: Duration,
    pub rebuild_retry_delay: Duration,
    pub event_capacity: usize,
}

/// Mutable pool state behind the control mutex.
struct PoolState {
    started: bool,
    /// Fetcher registration per active slot. At most one entry per slot;
    /// restart replaces, close drains.
    registrations: HashMap<usize, Registration>,
    /// Per-slot consecutive-failure counters shared with the poll loops.
    failure_counts: Vec<Arc<AtomicU32>>,
}

/// Subscribable consumer-pool source.
///
/// Built via [`SourceBuilder`](crate::SourceBuilder), which validates the
/// configuration eagerly and returns the pool inside an [`Arc`] so that
/// registrations and restart hooks can refer back to it.
///
/// `F` is the consumer factory, `M` the application message type delivered to
/// subscribers.
pub struct SubscribableSource<F, M>
where
    F: ConsumerFactory,
    M: Send + Sync + 'static,
{
    group_id: String,
    selector: TopicSelector,
    consumer_count: usize,
    auto_start: bool,
    poll_timeout: Duration,
    rebuild_retry_delay: Duration,
    factory: Arc<F>,
    engine: Arc<dyn FetchEngine<F::Consumer, M>>,
    converter: Arc<dyn RecordConverter<RecordOf<F>, M>>,
    token_store: Arc<dyn TokenStore>,
    processors: Arc<ProcessorSet<M>>,
    bus: EventBus,
    state: Mutex<PoolState>,
}

impl<F, M> SubscribableSource<F, M>
where
    F: ConsumerFactory,
    M: Send + Sync + 'static,
{
    pub(crate) fn new(
        settings: PoolSettings,
        factory: Arc<F>,
        engine: Arc<dyn FetchEngine<F::Consumer, M>>,
        converter: Arc<dyn RecordConverter<RecordOf<F>, M>>,
        token_store: Arc<dyn TokenStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            group_id: settings.group_id,
            selector: settings.selector,
            consumer_count: settings.consumer_count,
            auto_start: settings.auto_start,
            poll_timeout: settings.poll_timeout,
            rebuild_retry_delay: settings.rebuild_retry_delay,
            factory,
            engine,
            converter,
            token_store,
            processors: Arc::new(ProcessorSet::new()),
            bus: EventBus::new(settings.event_capacity),
            state: Mutex::new(PoolState {
                started: false,
                registrations: HashMap::new(),
                failure_counts: Vec::new(),
            }),
        })
    }

    /// Subscribes an event processor to every batch this source delivers.
    ///
    /// Adding the same `Arc` instance twice is a no-op for delivery and for
    /// consumer creation, but each call returns its own cancel handle.
    ///
    /// With auto-start enabled, the first subscription starts the pool; a
    /// start failure is reported through the event bus
    /// ([`SourceEventKind::StartFailed`]) rather than panicking, keeping the
    /// `subscribe -> Registration` contract. Cancelling the last remaining
    /// subscription under auto-start closes the pool.
    pub fn subscribe(self: &Arc<Self>, processor: Arc<dyn BatchProcessor<M>>) -> Registration {
        let added = self.processors.insert(Arc::clone(&processor));
        if !added {
            debug!(processor = processor.name(), "processor already subscribed");
        }

        if self.auto_start {
            if let Err(err) = self.start() {
                warn!(error = %err, "auto-start failed on subscribe");
                self.bus.publish(
                    SourceEvent::now(SourceEventKind::StartFailed).with_error(err.to_string()),
                );
            }
        }

        let weak = Arc::downgrade(self);
        Registration::new(move || {
            let Some(pool) = weak.upgrade() else {
                return false;
            };
            let removed = pool.processors.remove(&processor);
            if removed && pool.auto_start && pool.processors.is_empty() {
                pool.close();
            }
            removed
        })
    }

    /// Starts the pool: one consumer, one topic subscription, and one poll
    /// registration per slot.
    ///
    /// Idempotent; concurrent calls converge to exactly one consumer set. A
    /// factory or subscription error propagates to the caller; slots built
    /// before the failure keep their registrations and are reclaimed by
    /// [`close`](Self::close).
    ///
    /// Must be called from within a tokio runtime (the engine spawns the
    /// poll loops).
    pub fn start(self: &Arc<Self>) -> Result<(), BrokerError> {
        let mut state = self.lock_state();
        if state.started {
            return Ok(());
        }
        state.started = true;
        state.failure_counts = (0..self.consumer_count)
            .map(|_| Arc::new(AtomicU32::new(0)))
            .collect();

        for slot in 0..self.consumer_count {
            self.start_slot(&mut state, slot)?;
        }

        debug!(
            group_id = %self.group_id,
            consumers = self.consumer_count,
            selector = %self.selector.describe(),
            "source started"
        );
        self.bus.publish(SourceEvent::now(SourceEventKind::SourceStarted));
        Ok(())
    }

    /// Closes the pool: cancels every fetcher registration, clears the
    /// registration map, and clears the subscriber set.
    ///
    /// Idempotent; closing a never-started pool is a no-op. No registration
    /// entry survives this call no matter how many slot restarts happened
    /// since the last successful poll.
    pub fn close(&self) {
        let (was_started, registrations) = {
            let mut state = self.lock_state();
            let was_started = state.started;
            state.started = false;
            state.failure_counts.clear();
            (was_started, std::mem::take(&mut state.registrations))
        };

        for (slot, registration) in registrations {
            let was_active = registration.cancel();
            debug!(slot, was_active, "fetcher registration cancelled");
        }
        self.processors.clear();

        if was_started {
            debug!(group_id = %self.group_id, "source closed");
            self.bus.publish(SourceEvent::now(SourceEventKind::SourceClosed));
        }
    }

    /// Whether the pool currently has active consumers.
    pub fn is_started(&self) -> bool {
        self.lock_state().started
    }

    /// Number of live fetcher registrations (one per active slot).
    ///
    /// This is the first-class view of the bookkeeping invariant: 0 before
    /// start, `consumer_count` while started (restarts replace entries, they
    /// never add any), 0 after close.
    pub fn registration_count(&self) -> usize {
        self.lock_state().registrations.len()
    }

    /// Number of currently-subscribed processors.
    pub fn processor_count(&self) -> usize {
        self.processors.len()
    }

    /// Subscribes to the lifecycle event stream.
    pub fn events(&self) -> broadcast::Receiver<SourceEvent> {
        self.bus.subscribe()
    }

    /// The configured consumer group id.
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// The configured topic selector.
    pub fn topic_selector(&self) -> &TopicSelector {
        &self.selector
    }

    /// The configured number of consumer slots.
    pub fn consumer_count(&self) -> usize {
        self.consumer_count
    }

    /// Builds one slot: fresh consumer, topic subscription, poll loop.
    ///
    /// Called with the state lock held; inserting into the map replaces any
    /// previous registration for the slot, which keeps the one-entry-per-slot
    /// invariant across restarts.
    fn start_slot(
        self: &Arc<Self>,
        state: &mut PoolState,
        slot: usize,
    ) -> Result<(), BrokerError> {
        let mut consumer = self.factory.create_consumer(&self.group_id)?;
        self.bus
            .publish(SourceEvent::now(SourceEventKind::ConsumerCreated).with_slot(slot));
        debug!(slot, group_id = %self.group_id, "consumer created");

        consumer.subscribe(&self.selector)?;

        let weak = Arc::downgrade(self);
        let on_failure: FailureHook = Arc::new(move |err| {
            if let Some(pool) = weak.upgrade() {
                pool.handle_slot_failure(slot, err);
            }
        });

        let ctx = PollContext {
            slot,
            poll_timeout: self.poll_timeout,
            failure_count: Arc::clone(&state.failure_counts[slot]),
            converter: Arc::clone(&self.converter),
            token_store: Arc::clone(&self.token_store),
            sink: Arc::clone(&self.processors) as Arc<dyn BatchSink<M>>,
            on_failure,
            bus: self.bus.clone(),
        };

        let registration = self.engine.poll(consumer, ctx);
        if let Some(stale) = state.registrations.insert(slot, registration) {
            stale.cancel();
        }
        Ok(())
    }

    /// Reacts to a poll loop abandoning its consumer: rebuilds the slot with
    /// a fresh one, unless the pool closed in the meantime.
    ///
    /// When the rebuild itself fails (broker still down while creating the
    /// consumer), the previous map entry stays in place so the slot remains
    /// accounted for, and a delayed retry is scheduled.
    fn handle_slot_failure(self: &Arc<Self>, slot: usize, err: BrokerError) {
        let mut state = self.lock_state();
        if !state.started {
            debug!(slot, "ignoring slot failure after close");
            return;
        }
        debug!(slot, error = %err, "rebuilding slot after poll failure");

        match self.start_slot(&mut state, slot) {
            Ok(()) => {
                self.bus
                    .publish(SourceEvent::now(SourceEventKind::SlotRestarted).with_slot(slot));
            }
            Err(rebuild_err) => {
                warn!(slot, error = %rebuild_err, "slot rebuild failed, retrying");
                let weak = Arc::downgrade(self);
                let delay = self.rebuild_retry_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(pool) = weak.upgrade() {
                        pool.handle_slot_failure(slot, rebuild_err);
                    }
                });
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<F, M> std::fmt::Debug for SubscribableSource<F, M>
where
    F: ConsumerFactory,
    M: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscribableSource")
            .field("group_id", &self.group_id)
            .field("selector", &self.selector)
            .field("consumer_count", &self.consumer_count)
            .field("auto_start", &self.auto_start)
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

impl<F, M> Drop for SubscribableSource<F, M>
where
    F: ConsumerFactory,
    M: Send + Sync + 'static,
{
    fn drop(&mut self) {
        // Last-resort teardown; cancelling only touches loop tokens.
        let state = match self.state.get_mut() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        for (_, registration) in state.registrations.drain() {
            registration.cancel();
        }
    }
}
