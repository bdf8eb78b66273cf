//! Change observers: the ReadingObserver trait, a log observer and the state file writer.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::types::SensorSettings;
use crate::sensor::types::{AggregatedReading, PublishedReading, SENSOR_VALUE_INTERFACE};

/// Receives the published reading after every tick that changed it.
/// Delivery is in-process and best-effort; errors are logged by the publisher.
#[async_trait]
pub trait ReadingObserver: Send + Sync {
    fn name(&self) -> &str;

    async fn on_change(&self, reading: &PublishedReading) -> Result<()>;
}

/// Logs every change at INFO (stale/unavailable transitions at WARN).
pub struct LogObserver {
    sensor: SensorSettings,
}

impl LogObserver {
    pub fn new(sensor: SensorSettings) -> Self {
        Self { sensor }
    }
}

#[async_trait]
impl ReadingObserver for LogObserver {
    fn name(&self) -> &str {
        "log"
    }

    async fn on_change(&self, reading: &PublishedReading) -> Result<()> {
        let name = self.sensor.name();
        let unit = self.sensor.unit.symbol();

        match &reading.reading {
            AggregatedReading::Available { value, valid_sources, .. } if reading.stale => {
                warn!("{}: no source responded, holding {:.2} {} (stale)", name, value, unit);
                debug!("{}: last good reading used {} sources", name, valid_sources);
            }
            AggregatedReading::Available { value, valid_sources, .. } => {
                info!("{}: {:.2} {} ({} sources)", name, value, unit, valid_sources);
            }
            AggregatedReading::Unavailable { .. } => {
                warn!("{}: unavailable, no source responded", name);
            }
        }
        Ok(())
    }
}

/// On-disk view of the virtual sensor, mirroring the properties of a `Sensor.Value` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    pub name: String,
    pub object_path: String,
    pub interface: String,
    pub unit: String,
    pub min_value: f64,
    pub max_value: f64,
    /// Null whenever the reading is unavailable
    pub value: Option<f64>,
    pub published: PublishedReading,
    pub agent_version: String,
    pub written_at: String,
}

impl StateDocument {
    pub fn new(sensor: &SensorSettings, published: &PublishedReading) -> Self {
        Self {
            name: sensor.name().to_string(),
            object_path: sensor.object_path.clone(),
            interface: SENSOR_VALUE_INTERFACE.to_string(),
            unit: sensor.unit.dbus_name(),
            min_value: sensor.min_value,
            max_value: sensor.max_value,
            value: published.reading.value(),
            published: published.clone(),
            agent_version: env!("CARGO_PKG_VERSION").to_string(),
            written_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Writes a StateDocument for every change. Writes go to a temp file renamed into place,
/// so readers never see a partial document.
pub struct StateFileObserver {
    path: PathBuf,
    sensor: SensorSettings,
}

impl StateFileObserver {
    pub fn new(path: impl Into<PathBuf>, sensor: SensorSettings) -> Self {
        Self { path: path.into(), sensor }
    }

    /// Write the initial state. Failure here means the service cannot publish at all.
    pub async fn initialize(&self, initial: &PublishedReading) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("Cannot create state directory {:?}", dir))?;
            }
        }
        self.write(initial).await?;
        info!("Publishing state to {:?}", self.path);
        Ok(())
    }

    async fn write(&self, reading: &PublishedReading) -> Result<()> {
        let document = StateDocument::new(&self.sensor, reading);
        let content = serde_json::to_string_pretty(&document)?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write {:?}", tmp))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to move state file into {:?}", self.path))?;
        Ok(())
    }
}

#[async_trait]
impl ReadingObserver for StateFileObserver {
    fn name(&self) -> &str {
        "state-file"
    }

    async fn on_change(&self, reading: &PublishedReading) -> Result<()> {
        self.write(reading).await
    }
}

/// Read a state document written by a running service.
pub async fn read_state_file(path: &Path) -> Result<StateDocument> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Cannot read state file {:?}", path))?;
    let document = serde_json::from_str(&content)
        .with_context(|| format!("State file {:?} is not a valid state document", path))?;
    Ok(document)
}
