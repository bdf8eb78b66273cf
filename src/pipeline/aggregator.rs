//! Aggregation: reduces one tick's valid readings to the derived value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sensor::types::{AggregatedReading, SourceSample};

/// Combines the valid readings of a tick. Only called with a non-empty slice.
pub trait Reducer: Send + Sync {
    fn reduce(&self, values: &[f64]) -> f64;
}

/// Built-in reducers selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationPolicy {
    #[default]
    Sum,
    Average,
    Min,
    Max,
}

impl Reducer for AggregationPolicy {
    fn reduce(&self, values: &[f64]) -> f64 {
        match self {
            AggregationPolicy::Sum => values.iter().sum(),
            AggregationPolicy::Average => values.iter().sum::<f64>() / values.len() as f64,
            AggregationPolicy::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            AggregationPolicy::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Reduce the valid samples of a tick taken at `at`.
/// Zero valid samples yields `Unavailable`, never a zero value.
pub fn aggregate(samples: &[SourceSample], reducer: &dyn Reducer, at: DateTime<Utc>) -> AggregatedReading {
    let values: Vec<f64> = samples
        .iter()
        .filter_map(|s| s.result.value())
        .filter(|v| !v.is_nan())
        .collect();

    if values.is_empty() {
        return AggregatedReading::Unavailable { timestamp: at };
    }

    AggregatedReading::Available {
        value: reducer.reduce(&values),
        valid_sources: values.len(),
        timestamp: at,
    }
}
