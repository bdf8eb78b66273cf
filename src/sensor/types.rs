//! Sensor data types: source descriptors, per-tick samples, aggregated and published readings.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// D-Bus interface every sensor object (real or virtual) implements.
pub const SENSOR_VALUE_INTERFACE: &str = "xyz.openbmc_project.Sensor.Value";

/// Root of the sensor object tree.
pub const SENSOR_BASE_PATH: &str = "/xyz/openbmc_project/sensors";

/// How a source is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// `xyz.openbmc_project.Sensor.Value` object, queried through busctl
    #[default]
    Dbus,
    /// sysfs-style file holding a single number (hwmon `*_input`)
    File,
}

/// Units defined by `xyz.openbmc_project.Sensor.Value.Unit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SensorUnit {
    DegreesC,
    Volts,
    Amperes,
    #[default]
    Watts,
    Joules,
    RPMS,
    Percent,
    Meters,
    CFM,
    PercentRH,
    Pascals,
}

impl SensorUnit {
    /// Full D-Bus enumeration string, e.g. `xyz.openbmc_project.Sensor.Value.Unit.Watts`
    pub fn dbus_name(&self) -> String {
        format!("{}.Unit.{:?}", SENSOR_VALUE_INTERFACE, self)
    }

    /// Short suffix for human-readable output
    pub fn symbol(&self) -> &'static str {
        match self {
            SensorUnit::DegreesC => "°C",
            SensorUnit::Volts => "V",
            SensorUnit::Amperes => "A",
            SensorUnit::Watts => "W",
            SensorUnit::Joules => "J",
            SensorUnit::RPMS => "RPM",
            SensorUnit::Percent => "%",
            SensorUnit::Meters => "m",
            SensorUnit::CFM => "CFM",
            SensorUnit::PercentRH => "%RH",
            SensorUnit::Pascals => "Pa",
        }
    }
}

/// One configured input of the virtual sensor. Fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Object path for D-Bus sources, file path for file sources
    pub id: String,
    #[serde(default)]
    pub kind: SourceKind,
    /// Owning D-Bus service; resolved through the object mapper when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default)]
    pub unit: SensorUnit,
    /// Multiplier applied to raw file readings (hwmon reports milli/micro units)
    #[serde(default = "default_scale")]
    pub scale: f64,
}

pub fn default_scale() -> f64 { 1.0 }

impl SourceDescriptor {
    pub fn dbus(path: &str, service: Option<&str>, unit: SensorUnit) -> Self {
        Self {
            id: path.to_string(),
            kind: SourceKind::Dbus,
            service: service.map(str::to_string),
            unit,
            scale: 1.0,
        }
    }

    #[cfg(test)]
    pub fn file(path: &str, unit: SensorUnit, scale: f64) -> Self {
        Self {
            id: path.to_string(),
            kind: SourceKind::File,
            service: None,
            unit,
            scale,
        }
    }

    /// Last path segment, used as a short label in logs
    pub fn short_name(&self) -> &str {
        self.id.rsplit('/').next().unwrap_or(&self.id)
    }
}

/// Why a source contributed nothing to a tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("source unreachable: {0}")]
    Unreachable(String),
    #[error("query timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed reply: {0}")]
    MalformedReply(String),
    #[error("reading is not a number")]
    NotANumber,
}

/// Outcome of querying one source during one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleResult {
    Value { value: f64, timestamp: DateTime<Utc> },
    Absent { reason: QueryError },
}

impl SampleResult {
    pub fn value(&self) -> Option<f64> {
        match self {
            SampleResult::Value { value, .. } => Some(*value),
            SampleResult::Absent { .. } => None,
        }
    }
}

/// Sample paired with the source it came from. A tick yields these in configuration order.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSample {
    pub source: SourceDescriptor,
    pub result: SampleResult,
}

/// Derived value computed by one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AggregatedReading {
    Available {
        value: f64,
        valid_sources: usize,
        timestamp: DateTime<Utc>,
    },
    Unavailable { timestamp: DateTime<Utc> },
}

impl AggregatedReading {
    pub fn value(&self) -> Option<f64> {
        match self {
            AggregatedReading::Available { value, .. } => Some(*value),
            AggregatedReading::Unavailable { .. } => None,
        }
    }

    pub fn valid_sources(&self) -> usize {
        match self {
            AggregatedReading::Available { valid_sources, .. } => *valid_sources,
            AggregatedReading::Unavailable { .. } => 0,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            AggregatedReading::Available { timestamp, .. } => *timestamp,
            AggregatedReading::Unavailable { timestamp } => *timestamp,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, AggregatedReading::Available { .. })
    }
}

/// State served by the publisher to observers and readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedReading {
    pub reading: AggregatedReading,
    /// Set when the last tick produced nothing and the previous value is held
    pub stale: bool,
    /// Incremented on every change notification
    pub sequence: u64,
}

impl PublishedReading {
    pub fn initial(at: DateTime<Utc>) -> Self {
        Self {
            reading: AggregatedReading::Unavailable { timestamp: at },
            stale: false,
            sequence: 0,
        }
    }
}

impl fmt::Display for PublishedReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reading {
            AggregatedReading::Available { value, valid_sources, .. } => {
                write!(f, "{:.2} ({} sources)", value, valid_sources)?;
                if self.stale {
                    write!(f, " [stale]")?;
                }
                Ok(())
            }
            AggregatedReading::Unavailable { .. } => write!(f, "unavailable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_dbus_name_matches_interface_enum() {
        assert_eq!(SensorUnit::Watts.dbus_name(), "xyz.openbmc_project.Sensor.Value.Unit.Watts");
        assert_eq!(SensorUnit::DegreesC.dbus_name(), "xyz.openbmc_project.Sensor.Value.Unit.DegreesC");
    }

    #[test]
    fn descriptor_defaults_from_minimal_json() {
        let desc: SourceDescriptor =
            serde_json::from_str(r#"{"id":"/xyz/openbmc_project/sensors/power/PSU0_Output_Power"}"#).unwrap();
        assert_eq!(desc.kind, SourceKind::Dbus);
        assert_eq!(desc.unit, SensorUnit::Watts);
        assert_eq!(desc.scale, 1.0);
        assert!(desc.service.is_none());
        assert_eq!(desc.short_name(), "PSU0_Output_Power");
    }

    #[test]
    fn unavailable_reading_has_no_value() {
        let reading = AggregatedReading::Unavailable { timestamp: Utc::now() };
        assert_eq!(reading.value(), None);
        assert_eq!(reading.valid_sources(), 0);

        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert!(json.get("value").is_none());
    }

    #[test]
    fn stale_reading_display() {
        let published = PublishedReading {
            reading: AggregatedReading::Available { value: 750.0, valid_sources: 2, timestamp: Utc::now() },
            stale: true,
            sequence: 3,
        };
        assert_eq!(published.to_string(), "750.00 (2 sources) [stale]");
    }
}
