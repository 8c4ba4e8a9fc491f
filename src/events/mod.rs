//! Lifecycle events: data model and broadcast bus.
//!
//! The pool publishes [`SourceEvent`]s for every significant transition
//! (start, consumer creation, batch delivery, poll failure, slot restart,
//! close). Tests and operators observe them through
//! [`SubscribableSource::events`](crate::SubscribableSource::events); this is
//! the intended way to watch slot restarts instead of poking at internal
//! state.
//!
//! ## Contents
//! - [`SourceEvent`], [`SourceEventKind`] — event classification and metadata
//! - [`EventBus`] — thin wrapper over `tokio::sync::broadcast`

mod bus;
mod event;

pub use bus::EventBus;
pub use event::{SourceEvent, SourceEventKind};
