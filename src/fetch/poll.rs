//! Default fetch engine: one tokio task per consumer.
//!
//! [`PollEngine`] drives a subscribed consumer in a background task:
//!
//! ```text
//! loop {
//!   ├─► consumer.poll(poll_timeout)
//!   │       ├─ Ok(records) ──► convert ──► sink.deliver(batch)
//!   │       │                             token_store.advance(slot, n)
//!   │       └─ Err(e)      ──► sleep(backoff.next(failures))
//!   │                          on_failure(e)   (slot handed back)
//!   │                          return          (consumer dropped)
//!   └─ exit: registration cancelled ─► return  (consumer dropped)
//! }
//! ```
//!
//! A broker error ends the loop; the pool reacts to `on_failure` by building
//! a fresh consumer and a fresh registration for the slot. Backoff between a
//! failure and the restart signal is paced by a [`BackoffPolicy`]; the
//! failure counter lives in the [`PollContext`] so it survives restarts and
//! resets on the first successful poll.

use std::sync::atomic::Ordering;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::consumer::BrokerConsumer;
use crate::events::{SourceEvent, SourceEventKind};
use crate::fetch::engine::{FetchEngine, PollContext};
use crate::policies::BackoffPolicy;
use crate::registration::Registration;

/// Task-per-consumer fetch engine.
///
/// Must be used from within a tokio runtime; [`FetchEngine::poll`] spawns the
/// loop onto the ambient runtime.
#[derive(Clone, Copy, Debug, Default)]
pub struct PollEngine {
    backoff: BackoffPolicy,
}

impl PollEngine {
    /// Creates an engine with the default restart backoff.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the restart backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

impl<C, M> FetchEngine<C, M> for PollEngine
where
    C: BrokerConsumer,
    M: Send + Sync + 'static,
{
    fn poll(&self, consumer: C, ctx: PollContext<C::Record, M>) -> Registration {
        let token = CancellationToken::new();
        let loop_token = token.clone();
        let backoff = self.backoff;

        tokio::spawn(run_loop(consumer, ctx, backoff, loop_token));

        Registration::new(move || {
            let was_active = !token.is_cancelled();
            token.cancel();
            was_active
        })
    }
}

async fn run_loop<C, M>(
    mut consumer: C,
    ctx: PollContext<C::Record, M>,
    backoff: BackoffPolicy,
    token: CancellationToken,
) where
    C: BrokerConsumer,
    M: Send + Sync + 'static,
{
    let slot = ctx.slot;
    ctx.bus
        .publish(SourceEvent::now(SourceEventKind::PollLoopStarted).with_slot(slot));
    debug!(slot, "poll loop started");

    loop {
        let polled = tokio::select! {
            _ = token.cancelled() => {
                debug!(slot, "poll loop cancelled");
                return;
            }
            polled = consumer.poll(ctx.poll_timeout) => polled,
        };

        match polled {
            Ok(records) => {
                ctx.failure_count.store(0, Ordering::Relaxed);
                if records.is_empty() {
                    continue;
                }

                let polled_count = records.len();
                let batch: Vec<M> = records
                    .into_iter()
                    .filter_map(|record| ctx.converter.convert(record))
                    .collect();

                if !batch.is_empty() {
                    let delivered = batch.len();
                    ctx.sink.deliver(batch).await;
                    ctx.bus.publish(
                        SourceEvent::now(SourceEventKind::BatchDelivered)
                            .with_slot(slot)
                            .with_records(delivered),
                    );
                }
                ctx.token_store.advance(slot, polled_count);
            }
            Err(err) => {
                let failures = ctx.failure_count.fetch_add(1, Ordering::Relaxed);
                let delay = backoff.next(failures);
                if err.is_transient() {
                    warn!(slot, failures, ?delay, error = %err, "poll failed, slot will restart");
                } else {
                    error!(slot, failures, ?delay, error = %err, "poll failed, slot will restart");
                }
                ctx.bus.publish(
                    SourceEvent::now(SourceEventKind::PollFailed)
                        .with_slot(slot)
                        .with_error(err.to_string()),
                );

                tokio::select! {
                    _ = token.cancelled() => {
                        debug!(slot, "poll loop cancelled during restart pacing");
                        return;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
                (ctx.on_failure)(err);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::{NoopTokenStore, RecordConverter, TokenStore};
    use crate::error::BrokerError;
    use crate::events::EventBus;
    use crate::fetch::engine::BatchSink;
    use crate::topics::TopicSelector;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU32;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct ScriptedConsumer {
        script: Mutex<VecDeque<Result<Vec<u32>, BrokerError>>>,
    }

    impl ScriptedConsumer {
        fn new(script: Vec<Result<Vec<u32>, BrokerError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    #[async_trait]
    impl BrokerConsumer for ScriptedConsumer {
        type Record = u32;

        fn subscribe(&mut self, _selector: &TopicSelector) -> Result<(), BrokerError> {
            Ok(())
        }

        async fn poll(&mut self, _timeout: Duration) -> Result<Vec<u32>, BrokerError> {
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(step) => step,
                None => {
                    // Script exhausted: behave like an idle broker.
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    struct CollectingSink {
        batches: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl BatchSink<String> for CollectingSink {
        async fn deliver(&self, batch: Vec<String>) {
            self.batches.lock().unwrap().push(batch);
        }
    }

    struct CountingStore {
        total: std::sync::atomic::AtomicUsize,
    }

    impl TokenStore for CountingStore {
        fn advance(&self, _slot: usize, records: usize) {
            self.total
                .fetch_add(records, std::sync::atomic::Ordering::SeqCst);
        }
    }

    fn context(
        sink: Arc<dyn BatchSink<String>>,
        store: Arc<dyn TokenStore>,
        on_failure: crate::fetch::engine::FailureHook,
    ) -> PollContext<u32, String> {
        let converter: Arc<dyn RecordConverter<u32, String>> =
            Arc::new(|record: u32| (record % 2 == 0).then(|| record.to_string()));
        PollContext {
            slot: 0,
            poll_timeout: Duration::from_millis(10),
            failure_count: Arc::new(AtomicU32::new(0)),
            converter,
            token_store: store,
            sink,
            on_failure,
            bus: EventBus::new(16),
        }
    }

    #[tokio::test]
    async fn delivers_converted_batches_in_order() {
        let sink = Arc::new(CollectingSink {
            batches: Mutex::new(Vec::new()),
        });
        let store = Arc::new(CountingStore {
            total: std::sync::atomic::AtomicUsize::new(0),
        });
        let consumer = ScriptedConsumer::new(vec![Ok(vec![2, 3, 4]), Ok(vec![6])]);

        let engine = PollEngine::new();
        let registration = FetchEngine::<ScriptedConsumer, String>::poll(
            &engine,
            consumer,
            context(sink.clone(), store.clone(), Arc::new(|_| {})),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        registration.cancel();

        let batches = sink.batches.lock().unwrap().clone();
        assert_eq!(
            batches,
            vec![vec!["2".to_string(), "4".to_string()], vec!["6".to_string()]]
        );
        // The skipped odd record still counts as consumed progress.
        assert_eq!(store.total.load(std::sync::atomic::Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn failure_invokes_hook_once_and_ends_the_loop() {
        let sink = Arc::new(CollectingSink {
            batches: Mutex::new(Vec::new()),
        });
        let failures = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = Arc::clone(&failures);
        let consumer = ScriptedConsumer::new(vec![
            Err(BrokerError::unavailable("none available")),
            Ok(vec![2]),
        ]);

        let engine = PollEngine::new().with_backoff(BackoffPolicy {
            first: Duration::from_millis(1),
            ..BackoffPolicy::default()
        });
        let _registration = FetchEngine::<ScriptedConsumer, String>::poll(
            &engine,
            consumer,
            context(
                sink.clone(),
                Arc::new(NoopTokenStore),
                Arc::new(move |_err| {
                    seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                }),
            ),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(failures.load(std::sync::atomic::Ordering::SeqCst), 1);
        // The loop ended before reaching the scripted Ok batch.
        assert!(sink.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_during_pacing_suppresses_the_hook() {
        let sink = Arc::new(CollectingSink {
            batches: Mutex::new(Vec::new()),
        });
        let failures = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = Arc::clone(&failures);
        let consumer = ScriptedConsumer::new(vec![Err(BrokerError::unavailable("down"))]);

        let engine = PollEngine::new().with_backoff(BackoffPolicy {
            first: Duration::from_secs(60),
            ..BackoffPolicy::default()
        });
        let registration = FetchEngine::<ScriptedConsumer, String>::poll(
            &engine,
            consumer,
            context(
                sink,
                Arc::new(NoopTokenStore),
                Arc::new(move |_err| {
                    seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                }),
            ),
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(registration.cancel());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(failures.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
