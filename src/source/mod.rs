//! The subscribable source: pool orchestrator, builder, subscription registry.
//!
//! - [`builder`]: validated construction of the pool;
//! - [`pool`]: start/close lifecycle, slot bookkeeping, restart wiring;
//! - [`processors`]: identity-keyed subscriber set with isolated fan-out.

mod builder;
mod pool;
mod processors;

pub use builder::SourceBuilder;
pub use pool::{RecordOf, SubscribableSource};
pub use processors::{BatchProcessor, ProcessorSet};
