//! Builder for [`SubscribableSource`].
//!
//! Setters only record values; [`SourceBuilder::build`] validates everything
//! eagerly and hands back the pool inside an [`Arc`]. Configuration is
//! immutable after `build`, and a [`ConfigError`] only ever surfaces here,
//! never at runtime.

use std::sync::Arc;
use std::time::Duration;

use crate::consumer::{ConsumerFactory, NoopTokenStore, RecordConverter, TokenStore};
use crate::error::ConfigError;
use crate::fetch::FetchEngine;
use crate::source::pool::{PoolSettings, RecordOf, SubscribableSource};
use crate::topics::TopicSelector;

const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REBUILD_RETRY_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_EVENT_CAPACITY: usize = 128;

/// Builder for the consumer-pool source.
///
/// `F` is the consumer factory type, `M` the message type delivered to
/// subscribers.
///
/// # Example
/// ```rust,ignore
/// let source = SourceBuilder::new()
///     .topics(["orders", "refunds"])
///     .group_id("billing")
///     .consumer_factory(factory)
///     .fetch_engine(Arc::new(PollEngine::new()))
///     .converter(Arc::new(|record| Some(record)))
///     .consumer_count(2)
///     .auto_start()
///     .build()?;
/// ```
pub struct SourceBuilder<F, M>
where
    F: ConsumerFactory,
    M: Send + Sync + 'static,
{
    selector: Option<TopicSelector>,
    group_id: Option<String>,
    factory: Option<Arc<F>>,
    engine: Option<Arc<dyn FetchEngine<F::Consumer, M>>>,
    converter: Option<Arc<dyn RecordConverter<RecordOf<F>, M>>>,
    token_store: Arc<dyn TokenStore>,
    consumer_count: usize,
    auto_start: bool,
    poll_timeout: Duration,
    rebuild_retry_delay: Duration,
    event_capacity: usize,
}

impl<F, M> Default for SourceBuilder<F, M>
where
    F: ConsumerFactory,
    M: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<F, M> SourceBuilder<F, M>
where
    F: ConsumerFactory,
    M: Send + Sync + 'static,
{
    /// Creates a builder with defaults: one consumer, no auto-start, a 5s
    /// poll timeout, and a no-op token store.
    pub fn new() -> Self {
        Self {
            selector: None,
            group_id: None,
            factory: None,
            engine: None,
            converter: None,
            token_store: Arc::new(NoopTokenStore),
            consumer_count: 1,
            auto_start: false,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            rebuild_retry_delay: DEFAULT_REBUILD_RETRY_DELAY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Subscribes every consumer to this explicit topic list.
    ///
    /// Replaces a previously set list or pattern (last one wins).
    pub fn topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selector = Some(TopicSelector::list(topics));
        self
    }

    /// Appends one topic to the list, starting a list if none is set.
    ///
    /// Replaces a previously set pattern.
    pub fn add_topic(mut self, topic: impl Into<String>) -> Self {
        let topic = topic.into();
        self.selector = Some(match self.selector.take() {
            Some(TopicSelector::List(mut topics)) => {
                topics.push(topic);
                TopicSelector::List(topics)
            }
            _ => TopicSelector::List(vec![topic]),
        });
        self
    }

    /// Subscribes every consumer to a broker-side pattern.
    ///
    /// Replaces a previously set list (last one wins).
    pub fn topic_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.selector = Some(TopicSelector::pattern(pattern));
        self
    }

    /// Sets the consumer group id shared by every slot.
    pub fn group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Sets the factory that creates one consumer per slot.
    pub fn consumer_factory(mut self, factory: Arc<F>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Sets the fetch engine that runs the poll loops.
    pub fn fetch_engine(mut self, engine: Arc<dyn FetchEngine<F::Consumer, M>>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Sets the record-to-message converter.
    pub fn converter(mut self, converter: Arc<dyn RecordConverter<RecordOf<F>, M>>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Sets the progress-bookkeeping collaborator (defaults to a no-op).
    pub fn token_store(mut self, token_store: Arc<dyn TokenStore>) -> Self {
        self.token_store = token_store;
        self
    }

    /// Sets how many consumers the pool creates (default 1, must be ≥ 1).
    pub fn consumer_count(mut self, consumer_count: usize) -> Self {
        self.consumer_count = consumer_count;
        self
    }

    /// Starts the pool on the first subscription and closes it when the last
    /// subscription is cancelled.
    pub fn auto_start(mut self) -> Self {
        self.auto_start = true;
        self
    }

    /// Sets how long one broker poll may wait for records (default 5s).
    pub fn poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Sets the pause before re-attempting a slot rebuild whose consumer
    /// creation failed (default 500ms).
    pub fn rebuild_retry_delay(mut self, delay: Duration) -> Self {
        self.rebuild_retry_delay = delay;
        self
    }

    /// Sets the lifecycle event bus capacity (default 128).
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Validates the configuration and builds the pool.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] when a required collaborator is missing, the
    /// topic selector is absent or empty, the group id is absent or empty,
    /// the consumer count is 0, or the poll timeout is zero.
    pub fn build(self) -> Result<Arc<SubscribableSource<F, M>>, ConfigError> {
        let selector = match self.selector {
            None => return Err(ConfigError::MissingTopics),
            Some(TopicSelector::List(topics)) if topics.is_empty() => {
                return Err(ConfigError::EmptyTopicList)
            }
            Some(TopicSelector::List(topics)) if topics.iter().any(String::is_empty) => {
                return Err(ConfigError::EmptyTopicName)
            }
            Some(TopicSelector::Pattern(pattern)) if pattern.is_empty() => {
                return Err(ConfigError::EmptyTopicPattern)
            }
            Some(selector) => selector,
        };

        let group_id = match self.group_id {
            Some(group_id) if !group_id.is_empty() => group_id,
            _ => return Err(ConfigError::MissingGroupId),
        };

        if self.consumer_count == 0 {
            return Err(ConfigError::InvalidConsumerCount(0));
        }
        if self.poll_timeout.is_zero() {
            return Err(ConfigError::ZeroPollTimeout);
        }

        let factory = self.factory.ok_or(ConfigError::MissingConsumerFactory)?;
        let engine = self.engine.ok_or(ConfigError::MissingFetchEngine)?;
        let converter = self.converter.ok_or(ConfigError::MissingConverter)?;

        Ok(SubscribableSource::new(
            PoolSettings {
                group_id,
                selector,
                consumer_count: self.consumer_count,
                auto_start: self.auto_start,
                poll_timeout: self.poll_timeout,
                rebuild_retry_delay: self.rebuild_retry_delay,
                event_capacity: self.event_capacity,
            },
            factory,
            engine,
            converter,
            self.token_store,
        ))
    }
}
