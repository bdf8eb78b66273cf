//! Sensor listing: finds every `Sensor.Value` object through the object mapper and prints its reading.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use crate::sensor::types::{QueryError, SensorUnit, SourceDescriptor, SENSOR_BASE_PATH};
use crate::sensor::{BusctlSource, ValueSource};
use crate::system::executor::{BusctlRunner, SystemBusctl};
use crate::system::parser;

/// Bound on each sensor read, so one hung daemon cannot stall the listing.
pub const LIST_QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// One row of the listing.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRow {
    pub name: String,
    pub sensor_type: String,
    pub value: Option<f64>,
    pub unit: &'static str,
    pub service: String,
}

impl SensorRow {
    fn value_display(&self) -> String {
        match self.value {
            Some(v) => format!("{:.2} {}", v, self.unit),
            None => "N/A".to_string(),
        }
    }
}

/// `/xyz/openbmc_project/sensors` or one type below it; "all" means no filter.
pub fn search_path(filter: Option<&str>) -> String {
    match filter {
        Some(kind) if !kind.is_empty() && kind != "all" => format!("{}/{}", SENSOR_BASE_PATH, kind),
        _ => SENSOR_BASE_PATH.to_string(),
    }
}

/// Query the mapper, then read every (path, service) pair. Unreadable sensors keep `value: None`.
/// A mapper failure fails the whole listing.
pub async fn discover(
    filter: Option<&str>,
    runner: &dyn BusctlRunner,
    source: &dyn ValueSource,
    timeout: Duration,
) -> Result<Vec<SensorRow>> {
    let search = search_path(filter);
    let reply = runner
        .get_subtree(&search)
        .await
        .context("Object mapper query failed")?;
    let tree = parser::parse_subtree(&reply).context("Unexpected object mapper reply")?;
    debug!("Mapper returned {} objects under {}", tree.len(), search);

    let mut rows = Vec::new();
    for (path, services) in &tree {
        for service in services.keys() {
            // unit here only labels the descriptor, the query does not use it
            let descriptor = SourceDescriptor::dbus(path, Some(service), SensorUnit::default());
            let outcome = match tokio::time::timeout(timeout, source.query(&descriptor)).await {
                Ok(result) => result,
                Err(_) => Err(QueryError::Timeout(timeout)),
            };
            let value = match outcome {
                Ok(v) => Some(v),
                Err(e) => {
                    debug!("{} on {}: {}", path, service, e);
                    None
                }
            };

            rows.push(SensorRow {
                name: parser::sensor_name(path).to_string(),
                sensor_type: parser::sensor_type(path).to_string(),
                value,
                unit: parser::unit_display(path),
                service: service.clone(),
            });
        }
    }

    Ok(rows)
}

pub fn render_table(rows: &[SensorRow], filter: Option<&str>) -> String {
    if rows.is_empty() {
        return match filter {
            Some(kind) if !kind.is_empty() && kind != "all" => format!("No sensors found of type: {}\n", kind),
            _ => "No sensors found\n".to_string(),
        };
    }

    let mut out = format!("{:<30}{:<12}{:<15}{}\n", "Sensor", "Type", "Value", "Service");
    out.push_str(&"-".repeat(80));
    out.push('\n');

    for row in rows {
        out.push_str(&format!(
            "{:<30}{:<12}{:<15}{}\n",
            row.name,
            row.sensor_type,
            row.value_display(),
            row.service
        ));
    }

    out.push_str(&format!("\nTotal: {} sensors\n", rows.len()));
    out
}

/// `--list [TYPE]`
pub async fn list_sensors(filter: Option<&str>) -> Result<()> {
    let runner: Arc<dyn BusctlRunner> = Arc::new(SystemBusctl);
    let source = BusctlSource::with_runner(Arc::clone(&runner));
    let rows = discover(filter, runner.as_ref(), &source, LIST_QUERY_TIMEOUT).await?;
    print!("{}", render_table(&rows, filter));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::fake::FakeValueSource;
    use crate::system::fake::FakeBusctl;

    fn row(name: &str, kind: &str, value: Option<f64>, unit: &'static str) -> SensorRow {
        SensorRow {
            name: name.to_string(),
            sensor_type: kind.to_string(),
            value,
            unit,
            service: "xyz.openbmc_project.HwmonTempSensor".to_string(),
        }
    }

    #[test]
    fn search_path_filters_by_type() {
        assert_eq!(search_path(None), "/xyz/openbmc_project/sensors");
        assert_eq!(search_path(Some("all")), "/xyz/openbmc_project/sensors");
        assert_eq!(search_path(Some("power")), "/xyz/openbmc_project/sensors/power");
    }

    #[test]
    fn table_has_header_rows_and_total() {
        let rows = vec![
            row("CPU0_Temp", "temperature", Some(42.0), "°C"),
            row("Inlet_Temp", "temperature", None, "°C"),
        ];
        let table = render_table(&rows, Some("temperature"));
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("Sensor"));
        assert_eq!(lines[1], "-".repeat(80));
        assert!(lines[2].starts_with("CPU0_Temp"));
        assert!(lines[2].contains("42.00 °C"));
        assert!(lines[3].contains("N/A"));
        assert_eq!(lines.last().copied(), Some("Total: 2 sensors"));
    }

    const SUBTREE: &str = r#"{"type":"a{sa{sas}}","data":[{
        "/xyz/openbmc_project/sensors/power/PSU0_Output_Power":{"xyz.openbmc_project.PSUSensor":["xyz.openbmc_project.Sensor.Value"]},
        "/xyz/openbmc_project/sensors/power/PSU1_Output_Power":{"xyz.openbmc_project.PSUSensor":["xyz.openbmc_project.Sensor.Value"]}
    }]}"#;
    const PSU0: &str = "/xyz/openbmc_project/sensors/power/PSU0_Output_Power";
    const PSU1: &str = "/xyz/openbmc_project/sensors/power/PSU1_Output_Power";
    const PSU_SENSOR: &str = "xyz.openbmc_project.PSUSensor";

    #[tokio::test]
    async fn unreadable_sensor_is_listed_as_na() {
        let bus = Arc::new(
            FakeBusctl::new()
                .with_subtree("/xyz/openbmc_project/sensors/power", SUBTREE)
                .with_value(PSU_SENSOR, PSU0, 400.0),
        );
        let source = BusctlSource::with_runner(bus.clone());

        let rows = discover(Some("power"), bus.as_ref(), &source, LIST_QUERY_TIMEOUT).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "PSU0_Output_Power");
        assert_eq!(rows[0].value, Some(400.0));
        assert_eq!(rows[0].unit, "W");
        assert_eq!(rows[1].name, "PSU1_Output_Power");
        assert_eq!(rows[1].value, None);
        assert!(render_table(&rows, Some("power")).contains("N/A"));
    }

    #[tokio::test]
    async fn mapper_failure_fails_listing() {
        let bus = Arc::new(FakeBusctl::new().with_subtree_error(
            "/xyz/openbmc_project/sensors",
            "Failed to connect to bus: No such file or directory",
        ));
        let source = BusctlSource::with_runner(bus.clone());

        let err = discover(None, bus.as_ref(), &source, LIST_QUERY_TIMEOUT).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Object mapper query failed"));
        assert_eq!(bus.calls_to("get-property"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_sensor_times_out() {
        let bus = FakeBusctl::new().with_subtree("/xyz/openbmc_project/sensors/power", SUBTREE);
        let source = FakeValueSource::new()
            .with_delayed_value(PSU0, 400.0, Duration::from_secs(25))
            .with_value(PSU1, 350.0);

        let started = tokio::time::Instant::now();
        let rows = discover(Some("power"), &bus, &source, LIST_QUERY_TIMEOUT).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(25));
        assert_eq!(rows[0].value, None);
        assert_eq!(rows[1].value, Some(350.0));
    }

    #[test]
    fn empty_listing_names_the_filter() {
        assert_eq!(render_table(&[], Some("fan_pwm")), "No sensors found of type: fan_pwm\n");
        assert_eq!(render_table(&[], None), "No sensors found\n");
    }
}
