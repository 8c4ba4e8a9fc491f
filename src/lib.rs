//! # fetchpool
//!
//! **fetchpool** is a subscribable consumer-pool message source: it lazily
//! creates N broker consumers, binds each one to a supervised background
//! poll loop, and fans every delivered batch out to the currently-subscribed
//! event processors.
//!
//! The broker itself stays behind small collaborator traits; this crate owns
//! the lifecycle, the bookkeeping, and the fan-out — not the wire protocol,
//! serialization, or offset semantics.
//!
//! ## Architecture
//! ```text
//!               subscribe() / cancel()
//!  processors ──────────────────────────► SubscribableSource
//!                                          │  (start guard, registration map)
//!            ┌─────────────────────────────┼─────────────────────────────┐
//!            ▼                             ▼                             ▼
//!     slot 0: consumer            slot 1: consumer             slot N-1: consumer
//!     (factory + selector)        (factory + selector)         (factory + selector)
//!            │                             │                             │
//!            ▼                             ▼                             ▼
//!     PollEngine task             PollEngine task               PollEngine task
//!       poll → convert → deliver    ...                           ...
//!            │                             │                             │
//!            └───────────► ProcessorSet::dispatch (identity-keyed) ◄─────┘
//!                                  │
//!                       every subscribed BatchProcessor
//!
//!  broker error in a loop ──► backoff ──► slot handed back ──► fresh consumer
//!                                         (map entry replaced, never added)
//!  close() ──► cancel every registration ──► map emptied, subscribers cleared
//! ```
//!
//! ## Lifecycle
//! - **Idle → Started**: explicit [`SubscribableSource::start`], or the first
//!   [`SubscribableSource::subscribe`] when auto-start is enabled. Re-entrant;
//!   concurrent starts converge to one consumer set.
//! - **Started**: each slot owns one consumer and one cancelable
//!   [`Registration`]. A failed poll loop hands its slot back; the pool
//!   rebuilds it with a fresh consumer, replacing the slot's map entry.
//! - **Started → Closed**: [`SubscribableSource::close`] cancels every
//!   registration (idempotently), empties the map, and clears the subscriber
//!   set. Under auto-start, cancelling the last subscription does the same.
//!
//! ## Example
//! ```rust,ignore
//! use std::sync::Arc;
//! use fetchpool::{PollEngine, SourceBuilder};
//!
//! let source = SourceBuilder::new()
//!     .topics(["orders"])
//!     .group_id("billing")
//!     .consumer_factory(Arc::new(my_factory))
//!     .fetch_engine(Arc::new(PollEngine::new()))
//!     .converter(Arc::new(my_converter))
//!     .auto_start()
//!     .build()?;
//!
//! let registration = source.subscribe(Arc::new(my_processor));
//! // ... records flow ...
//! registration.cancel(); // last subscriber gone → pool closes
//! ```
//!
//! ## Features
//! | Area            | Description                                             | Key types                                    |
//! |-----------------|---------------------------------------------------------|----------------------------------------------|
//! | **Pool**        | Consumer-slot lifecycle, start guard, registration map. | [`SubscribableSource`], [`SourceBuilder`]    |
//! | **Subscribers** | Identity-keyed registry with isolated fan-out.          | [`BatchProcessor`], [`ProcessorSet`]         |
//! | **Fetching**    | Pluggable poll loops over broker consumers.             | [`FetchEngine`], [`PollEngine`]              |
//! | **Collaborators**| Broker-facing seams implemented by the embedder.       | [`ConsumerFactory`], [`BrokerConsumer`], [`RecordConverter`], [`TokenStore`] |
//! | **Policies**    | Restart pacing between consumer rebuilds.               | [`BackoffPolicy`], [`JitterPolicy`]          |
//! | **Observability**| Lifecycle event stream and structured tracing.         | [`SourceEvent`], [`SourceEventKind`]         |
//! | **Errors**      | Build-time vs broker-side failure domains.              | [`ConfigError`], [`BrokerError`]             |

mod consumer;
mod error;
mod events;
mod fetch;
mod policies;
mod registration;
mod source;
mod topics;

// ---- Public re-exports ----

pub use consumer::{BrokerConsumer, ConsumerFactory, NoopTokenStore, RecordConverter, TokenStore};
pub use error::{BrokerError, ConfigError};
pub use events::{EventBus, SourceEvent, SourceEventKind};
pub use fetch::{BatchSink, FailureHook, FetchEngine, PollContext, PollEngine};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use registration::Registration;
pub use source::{BatchProcessor, ProcessorSet, RecordOf, SourceBuilder, SubscribableSource};
pub use topics::TopicSelector;
