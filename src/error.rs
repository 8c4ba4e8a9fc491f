//! Error types used by the source builder and the poll loops.
//!
//! Two error enums cover the two failure domains:
//!
//! - [`ConfigError`] — raised synchronously by [`SourceBuilder::build`](crate::SourceBuilder::build);
//!   never at runtime.
//! - [`BrokerError`] — raised by broker collaborators (factory, consumer handle)
//!   and handled inside the fetch engine's poll loop.
//!
//! Both provide `as_label` for logs/metrics; [`BrokerError::is_transient`]
//! tells the poll loop whether a fresh consumer is worth trying.

use thiserror::Error;

/// Build-time configuration errors.
///
/// Every variant corresponds to a required field that is missing or a value
/// that fails validation. These are fatal to the offending `build()` call and
/// do not affect other source instances.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither a topic list nor a topic pattern was provided.
    #[error("a topic list or a topic pattern must be provided")]
    MissingTopics,

    /// The topic list was provided but is empty.
    #[error("the topic list may not be empty")]
    EmptyTopicList,

    /// A topic name in the list is an empty string.
    #[error("topic names may not be empty")]
    EmptyTopicName,

    /// The topic pattern is an empty string.
    #[error("the topic pattern may not be empty")]
    EmptyTopicPattern,

    /// No consumer group id was provided, or it is an empty string.
    #[error("a non-empty consumer group id must be provided")]
    MissingGroupId,

    /// No consumer factory was provided.
    #[error("a consumer factory must be provided")]
    MissingConsumerFactory,

    /// No fetch engine was provided.
    #[error("a fetch engine must be provided")]
    MissingFetchEngine,

    /// No record converter was provided.
    #[error("a record converter must be provided")]
    MissingConverter,

    /// The consumer count must be at least 1.
    #[error("the consumer count must be at least 1, got {0}")]
    InvalidConsumerCount(usize),

    /// The poll timeout must be greater than zero.
    #[error("the poll timeout must be greater than zero")]
    ZeroPollTimeout,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::MissingTopics => "config_missing_topics",
            ConfigError::EmptyTopicList => "config_empty_topic_list",
            ConfigError::EmptyTopicName => "config_empty_topic_name",
            ConfigError::EmptyTopicPattern => "config_empty_topic_pattern",
            ConfigError::MissingGroupId => "config_missing_group_id",
            ConfigError::MissingConsumerFactory => "config_missing_consumer_factory",
            ConfigError::MissingFetchEngine => "config_missing_fetch_engine",
            ConfigError::MissingConverter => "config_missing_converter",
            ConfigError::InvalidConsumerCount(_) => "config_invalid_consumer_count",
            ConfigError::ZeroPollTimeout => "config_zero_poll_timeout",
        }
    }
}

/// Errors produced by broker collaborators.
///
/// These surface from [`ConsumerFactory::create_consumer`](crate::ConsumerFactory::create_consumer)
/// and [`BrokerConsumer`](crate::BrokerConsumer) calls. The pool propagates
/// them from an explicit `start()`; inside a running poll loop they are
/// handled by restarting the slot with a fresh consumer.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum BrokerError {
    /// The broker could not be reached (no node available, connection lost).
    #[error("broker unavailable: {reason}")]
    Unavailable {
        /// Underlying failure description.
        reason: String,
    },

    /// Subscribing the consumer to the configured topics/pattern failed.
    #[error("topic subscription failed: {reason}")]
    Subscription {
        /// Underlying failure description.
        reason: String,
    },

    /// A poll attempt failed in a way that is not worth retrying.
    #[error("fetch failed: {reason}")]
    Fetch {
        /// Underlying failure description.
        reason: String,
    },
}

impl BrokerError {
    /// Shorthand for [`BrokerError::Unavailable`].
    pub fn unavailable(reason: impl Into<String>) -> Self {
        BrokerError::Unavailable {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`BrokerError::Subscription`].
    pub fn subscription(reason: impl Into<String>) -> Self {
        BrokerError::Subscription {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`BrokerError::Fetch`].
    pub fn fetch(reason: impl Into<String>) -> Self {
        BrokerError::Fetch {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BrokerError::Unavailable { .. } => "broker_unavailable",
            BrokerError::Subscription { .. } => "broker_subscription_failed",
            BrokerError::Fetch { .. } => "broker_fetch_failed",
        }
    }

    /// Whether a fresh consumer is worth trying after this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BrokerError::Unavailable { .. } | BrokerError::Subscription { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(BrokerError::unavailable("none available").is_transient());
        assert!(BrokerError::subscription("acl denied").is_transient());
        assert!(!BrokerError::fetch("corrupt batch").is_transient());
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(
            ConfigError::MissingTopics.as_label(),
            "config_missing_topics"
        );
        assert_eq!(
            BrokerError::unavailable("x").as_label(),
            "broker_unavailable"
        );
    }
}
