//! Config file location, load and save.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

use crate::config::types::ServiceConfig;

/// `config.json` next to the executable.
pub fn default_config_path() -> Result<PathBuf> {
    let exe_dir = std::env::current_exe()?
        .parent()
        .ok_or_else(|| anyhow!("Cannot determine executable directory"))?
        .to_path_buf();
    Ok(exe_dir.join("config.json"))
}

pub fn resolve_config_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p.to_path_buf()),
        None => default_config_path(),
    }
}

/// Load and validate the configuration. A missing or invalid file is a startup failure.
pub async fn load_config(path: &Path) -> Result<ServiceConfig> {
    if !path.exists() {
        return Err(anyhow!(
            "Configuration file not found: {:?} (create one with --init-config)",
            path
        ));
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;
    let config: ServiceConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {:?}", path))?;

    config
        .validate()
        .with_context(|| format!("Invalid configuration in {:?}", path))?;

    info!("Loaded configuration from: {:?}", path);
    debug!(
        "{} sources, policy {:?}, unavailable policy {:?}",
        config.sources.len(),
        config.aggregation.policy,
        config.publishing.unavailable_policy
    );
    Ok(config)
}

pub async fn save_config(config: &ServiceConfig, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {:?}", path))?;
    info!("Configuration saved to: {:?}", path);
    Ok(())
}

/// Write the default configuration, refusing to clobber an existing file.
pub async fn init_config(path: &Path) -> Result<ServiceConfig> {
    if path.exists() {
        return Err(anyhow!("Refusing to overwrite existing configuration {:?}", path));
    }
    let config = ServiceConfig::default();
    save_config(&config, path).await?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{AggregationPolicy, UnavailablePolicy};
    use crate::sensor::types::SourceKind;

    #[tokio::test]
    async fn init_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let written = init_config(&path).await.unwrap();
        let loaded = load_config(&path).await.unwrap();
        assert_eq!(written, loaded);

        assert!(init_config(&path).await.is_err());
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.json")).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn minimal_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "sensor": {"object_path": "/xyz/openbmc_project/sensors/temperature/Max_Inlet", "unit": "DegreesC", "min_value": -40, "max_value": 125},
                "sources": [
                    {"id": "/sys/class/hwmon/hwmon2/temp1_input", "kind": "file", "unit": "DegreesC", "scale": 0.001},
                    {"id": "/xyz/openbmc_project/sensors/temperature/Inlet_1", "unit": "DegreesC"}
                ],
                "polling": {"interval": 2.5, "source_timeout": 1.0},
                "aggregation": {"policy": "max"},
                "publishing": {"state_file": "/tmp/Max_Inlet.json"}
            }"#,
        )
        .unwrap();

        let config = load_config(&path).await.unwrap();
        assert_eq!(config.sensor.name(), "Max_Inlet");
        assert_eq!(config.sources[0].kind, SourceKind::File);
        assert_eq!(config.sources[1].kind, SourceKind::Dbus);
        assert_eq!(config.aggregation.policy, AggregationPolicy::Max);
        assert_eq!(config.publishing.unavailable_policy, UnavailablePolicy::MarkStale);
        assert_eq!(config.polling.drain_timeout, 5.0);
        assert_eq!(config.logging.log_level, "INFO");
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_with_reason() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = ServiceConfig::default();
        config.sources.clear();
        save_config(&config, &path).await.unwrap();

        let err = load_config(&path).await.unwrap_err();
        assert!(format!("{:#}", err).contains("no sources configured"));
    }
}
