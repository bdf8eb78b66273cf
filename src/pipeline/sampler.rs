//! Sampler: queries every configured source once per tick, each under its own timeout.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use tracing::{debug, trace};

use crate::sensor::types::{QueryError, SampleResult, SourceDescriptor, SourceSample};
use crate::sensor::ValueSource;

pub struct Sampler {
    source: Arc<dyn ValueSource>,
    descriptors: Vec<SourceDescriptor>,
    timeout: Duration,
}

impl Sampler {
    pub fn new(source: Arc<dyn ValueSource>, descriptors: Vec<SourceDescriptor>, timeout: Duration) -> Self {
        Self { source, descriptors, timeout }
    }

    pub fn descriptors(&self) -> &[SourceDescriptor] {
        &self.descriptors
    }

    /// Query all sources concurrently. Results come back in configuration order;
    /// a failing source is recorded as absent and never affects the others.
    pub async fn sample(&self) -> Vec<SourceSample> {
        let queries = self.descriptors.iter().map(|desc| async move {
            let result = self.sample_one(desc).await;
            SourceSample { source: desc.clone(), result }
        });

        let samples = join_all(queries).await;
        trace!(
            "Sampled {} sources, {} valid",
            samples.len(),
            samples.iter().filter(|s| s.result.value().is_some()).count()
        );
        samples
    }

    async fn sample_one(&self, desc: &SourceDescriptor) -> SampleResult {
        let outcome = match tokio::time::timeout(self.timeout, self.source.query(desc)).await {
            Ok(Ok(value)) if value.is_finite() => Ok(value),
            Ok(Ok(_)) => Err(QueryError::NotANumber),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(QueryError::Timeout(self.timeout)),
        };

        match outcome {
            Ok(value) => SampleResult::Value { value, timestamp: Utc::now() },
            Err(reason) => {
                debug!("Source {} absent this tick: {}", desc.short_name(), reason);
                SampleResult::Absent { reason }
            }
        }
    }
}
