//! busctl subprocess executor.
//! Spawns busctl in JSON output mode and respects VSENSOR_BUS_HOST / VSENSOR_BUS_USER for testing off-target.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::{debug, trace};

use crate::sensor::types::SENSOR_VALUE_INTERFACE;

pub const OBJECT_MAPPER_SERVICE: &str = "xyz.openbmc_project.ObjectMapper";
pub const OBJECT_MAPPER_PATH: &str = "/xyz/openbmc_project/object_mapper";
pub const OBJECT_MAPPER_INTERFACE: &str = "xyz.openbmc_project.ObjectMapper";

/// Build a busctl Command with the correct bus selection flags.
/// If VSENSOR_BUS_HOST is set, busctl connects to that host over ssh.
/// If VSENSOR_BUS_USER is set, the user bus is used instead of the system bus.
pub fn build_busctl_command() -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("busctl");

    if let Ok(host) = std::env::var("VSENSOR_BUS_HOST") {
        debug!("busctl routing to remote host: {}", host);
        cmd.args(["-H", &host]);
    } else if std::env::var("VSENSOR_BUS_USER").is_ok() {
        cmd.arg("--user");
    }

    // A timed-out query drops the future; the child must not outlive it
    cmd.arg("--json=short").kill_on_drop(true);
    cmd
}

async fn run(mut cmd: tokio::process::Command, what: &str) -> Result<String> {
    trace!("Executing: busctl {:?}", cmd.as_std().get_args().collect::<Vec<_>>());

    let output = cmd
        .output()
        .await
        .with_context(|| format!("Failed to execute busctl {}", what))?;

    if !output.status.success() {
        return Err(anyhow!(
            "busctl {} failed: {}",
            what,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Execute `busctl get-property <service> <path> xyz.openbmc_project.Sensor.Value Value`.
pub async fn run_busctl_get_value(service: &str, path: &str) -> Result<String> {
    let mut cmd = build_busctl_command();
    cmd.args(["get-property", service, path, SENSOR_VALUE_INTERFACE, "Value"]);
    run(cmd, "get-property").await
}

/// Ask the object mapper which service owns `path` with the sensor value interface.
pub async fn run_busctl_get_object(path: &str) -> Result<String> {
    let mut cmd = build_busctl_command();
    cmd.args([
        "call",
        OBJECT_MAPPER_SERVICE,
        OBJECT_MAPPER_PATH,
        OBJECT_MAPPER_INTERFACE,
        "GetObject",
        "sas",
        path,
        "1",
        SENSOR_VALUE_INTERFACE,
    ]);
    debug!("Resolving service for {}", path);
    run(cmd, "GetObject").await
}

/// Ask the object mapper for every sensor value object below `search_path`.
pub async fn run_busctl_get_subtree(search_path: &str) -> Result<String> {
    let mut cmd = build_busctl_command();
    cmd.args([
        "call",
        OBJECT_MAPPER_SERVICE,
        OBJECT_MAPPER_PATH,
        OBJECT_MAPPER_INTERFACE,
        "GetSubTree",
        "sias",
        search_path,
        "0",
        "1",
        SENSOR_VALUE_INTERFACE,
    ]);
    debug!("Executing: GetSubTree {}", search_path);
    run(cmd, "GetSubTree").await
}

/// The busctl calls the sensor sources and the listing depend on.
#[async_trait]
pub trait BusctlRunner: Send + Sync {
    async fn get_value(&self, service: &str, path: &str) -> Result<String>;

    async fn get_object(&self, path: &str) -> Result<String>;

    async fn get_subtree(&self, search_path: &str) -> Result<String>;
}

/// Runs the real busctl binary.
#[derive(Debug, Default)]
pub struct SystemBusctl;

#[async_trait]
impl BusctlRunner for SystemBusctl {
    async fn get_value(&self, service: &str, path: &str) -> Result<String> {
        run_busctl_get_value(service, path).await
    }

    async fn get_object(&self, path: &str) -> Result<String> {
        run_busctl_get_object(path).await
    }

    async fn get_subtree(&self, search_path: &str) -> Result<String> {
        run_busctl_get_subtree(search_path).await
    }
}
