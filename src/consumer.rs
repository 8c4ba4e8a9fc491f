//! Broker-facing collaborator traits.
//!
//! The pool never speaks a wire protocol itself. It works against four small
//! contracts:
//!
//! - [`ConsumerFactory`] creates a consumer handle bound to a group id.
//! - [`BrokerConsumer`] subscribes to topics and polls record batches.
//! - [`RecordConverter`] turns raw records into application messages.
//! - [`TokenStore`] receives progress notifications after delivered batches;
//!   what it persists (offsets, tracking tokens) is its own business.
//!
//! Implementations wrap a real broker client; tests substitute mocks.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BrokerError;
use crate::topics::TopicSelector;

/// A broker consumer handle bound to a group id.
///
/// Created once per slot by the [`ConsumerFactory`], subscribed exactly once
/// by the pool, then moved into the fetch engine's poll loop which drives it
/// exclusively until cancellation or failure.
#[async_trait]
pub trait BrokerConsumer: Send + 'static {
    /// The raw record type this consumer yields.
    type Record: Send + 'static;

    /// Subscribes this consumer to the configured topics or pattern.
    fn subscribe(&mut self, selector: &TopicSelector) -> Result<(), BrokerError>;

    /// Polls the broker for the next batch of records.
    ///
    /// Returns an empty batch when nothing arrived within `timeout`; order
    /// within the returned batch is the broker's delivery order and is
    /// preserved all the way to the subscribers.
    async fn poll(&mut self, timeout: Duration) -> Result<Vec<Self::Record>, BrokerError>;
}

/// Creates broker consumers for the pool's group id.
///
/// Stateless from the pool's perspective; invoked once per slot on start and
/// once per slot restart. A [`BrokerError`] from the initial start propagates
/// to the caller of `start()`; during restarts the slot retries.
pub trait ConsumerFactory: Send + Sync + 'static {
    /// The consumer type this factory produces.
    type Consumer: BrokerConsumer;

    /// Creates a consumer bound to `group_id`.
    fn create_consumer(&self, group_id: &str) -> Result<Self::Consumer, BrokerError>;
}

/// Converts one raw record into an application message.
///
/// Returning `None` skips the record (e.g. a tombstone or an entry the
/// deserializer rejects); skipped records still count as consumed.
pub trait RecordConverter<R, M>: Send + Sync + 'static {
    /// Converts `record`, or skips it.
    fn convert(&self, record: R) -> Option<M>;
}

impl<R, M, F> RecordConverter<R, M> for F
where
    F: Fn(R) -> Option<M> + Send + Sync + 'static,
{
    fn convert(&self, record: R) -> Option<M> {
        self(record)
    }
}

/// Progress bookkeeping collaborator.
///
/// The poll loop calls [`advance`](TokenStore::advance) after every batch it
/// delivered. Offset/commit semantics live entirely in the implementation;
/// the pool ships [`NoopTokenStore`] for setups where the broker client
/// commits on its own.
pub trait TokenStore: Send + Sync + 'static {
    /// Records that `records` messages from `slot` were delivered downstream.
    fn advance(&self, slot: usize, records: usize);
}

/// A [`TokenStore`] that keeps no state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTokenStore;

impl TokenStore for NoopTokenStore {
    fn advance(&self, _slot: usize, _records: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_converters() {
        let converter: &dyn RecordConverter<i32, String> =
            &|record: i32| (record >= 0).then(|| record.to_string());
        assert_eq!(converter.convert(7), Some("7".to_string()));
        assert_eq!(converter.convert(-1), None);
    }
}
