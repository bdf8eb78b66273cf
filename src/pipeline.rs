//! Derived-value pipeline: sampler, aggregation, publisher, observers and the tick scheduler.

pub mod aggregator;
pub mod observers;
pub mod publisher;
pub mod sampler;
pub mod scheduler;

pub use aggregator::{AggregationPolicy, Reducer};
pub use observers::{LogObserver, ReadingObserver, StateFileObserver};
pub use publisher::{Publisher, UnavailablePolicy};
pub use sampler::Sampler;
pub use scheduler::{Scheduler, StopOutcome};
