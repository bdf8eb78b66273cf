//! Service configuration structs and defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::{AggregationPolicy, UnavailablePolicy};
use crate::sensor::types::{SensorUnit, SourceDescriptor, SENSOR_BASE_PATH};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub sensor: SensorSettings,
    pub sources: Vec<SourceDescriptor>,
    pub polling: PollingSettings,
    #[serde(default)]
    pub aggregation: AggregationSettings,
    pub publishing: PublishingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// The virtual sensor being published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSettings {
    pub object_path: String,
    pub unit: SensorUnit,
    pub min_value: f64,
    pub max_value: f64,
}

impl SensorSettings {
    pub fn name(&self) -> &str {
        self.object_path.rsplit('/').next().unwrap_or(&self.object_path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingSettings {
    pub interval: f64,       // seconds between end of one tick and start of the next
    pub source_timeout: f64, // per-source query bound, seconds
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout: f64,  // how long shutdown waits for an in-flight tick
}

pub fn default_drain_timeout() -> f64 { 5.0 }

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.source_timeout)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.drain_timeout)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationSettings {
    #[serde(default)]
    pub policy: AggregationPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishingSettings {
    #[serde(default)]
    pub unavailable_policy: UnavailablePolicy,
    #[serde(default)]
    pub change_epsilon: f64, // 0.0 = notify on any difference
    pub state_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub log_level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { log_level: "INFO".to_string() }
    }
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            object_path: format!("{}/power/Total_Power", SENSOR_BASE_PATH),
            unit: SensorUnit::Watts,
            min_value: 0.0,
            max_value: 10000.0,
        }
    }
}

impl Default for ServiceConfig {
    /// Total system power from the two PSU output power sensors.
    fn default() -> Self {
        let psu = |n: u8| {
            SourceDescriptor::dbus(
                &format!("{}/power/PSU{}_Output_Power", SENSOR_BASE_PATH, n),
                Some("xyz.openbmc_project.PSUSensor"),
                SensorUnit::Watts,
            )
        };

        Self {
            sensor: SensorSettings::default(),
            sources: vec![psu(0), psu(1)],
            polling: PollingSettings {
                interval: 1.0,
                source_timeout: 2.0,
                drain_timeout: default_drain_timeout(),
            },
            aggregation: AggregationSettings::default(),
            publishing: PublishingSettings {
                unavailable_policy: UnavailablePolicy::MarkStale,
                change_epsilon: 0.0,
                state_file: "/run/bmc-virtual-sensor/Total_Power.json".to_string(),
            },
            logging: LoggingSettings::default(),
        }
    }
}
