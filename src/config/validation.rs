//! Startup validation of the loaded configuration.

use std::collections::HashSet;

use thiserror::Error;

use crate::config::types::ServiceConfig;
use crate::sensor::types::SourceKind;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("no sources configured")]
    NoSources,
    #[error("polling.{field} must be a positive number of seconds, got {value}")]
    NonPositiveDuration { field: &'static str, value: f64 },
    #[error("publishing.change_epsilon must be >= 0, got {0}")]
    NegativeEpsilon(f64),
    #[error("sensor.min_value ({min}) is greater than sensor.max_value ({max})")]
    InvertedRange { min: f64, max: f64 },
    #[error("source {id} reports {source_unit:?} but the sensor is {sensor_unit:?}")]
    UnitMismatch {
        id: String,
        source_unit: crate::sensor::types::SensorUnit,
        sensor_unit: crate::sensor::types::SensorUnit,
    },
    #[error("source {id} has scale {scale}; file sources need a finite, non-zero scale")]
    InvalidScale { id: String, scale: f64 },
    #[error("source {0} is configured more than once")]
    DuplicateSource(String),
    #[error("sensor.object_path must be an absolute object path, got '{0}'")]
    InvalidObjectPath(String),
    #[error("publishing.state_file must not be empty")]
    EmptyStateFile,
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }

        for (field, value) in [
            ("interval", self.polling.interval),
            ("source_timeout", self.polling.source_timeout),
            ("drain_timeout", self.polling.drain_timeout),
        ] {
            // also rejects NaN
            if !(value > 0.0) || !value.is_finite() {
                return Err(ConfigError::NonPositiveDuration { field, value });
            }
        }

        if !(self.publishing.change_epsilon >= 0.0) {
            return Err(ConfigError::NegativeEpsilon(self.publishing.change_epsilon));
        }

        if self.sensor.min_value > self.sensor.max_value {
            return Err(ConfigError::InvertedRange {
                min: self.sensor.min_value,
                max: self.sensor.max_value,
            });
        }

        if !self.sensor.object_path.starts_with('/') || self.sensor.object_path.ends_with('/') {
            return Err(ConfigError::InvalidObjectPath(self.sensor.object_path.clone()));
        }

        if self.publishing.state_file.trim().is_empty() {
            return Err(ConfigError::EmptyStateFile);
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.id.as_str()) {
                return Err(ConfigError::DuplicateSource(source.id.clone()));
            }
            if source.unit != self.sensor.unit {
                return Err(ConfigError::UnitMismatch {
                    id: source.id.clone(),
                    source_unit: source.unit,
                    sensor_unit: self.sensor.unit,
                });
            }
            // zero would pin the source at a plausible-looking 0.0
            if source.kind == SourceKind::File && (source.scale == 0.0 || !source.scale.is_finite()) {
                return Err(ConfigError::InvalidScale {
                    id: source.id.clone(),
                    scale: source.scale,
                });
            }
        }

        Ok(())
    }
}
