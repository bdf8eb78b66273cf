//! busctl JSON reply parser.
//! Converts `busctl --json=short` output into sensor values, owning services and object trees,
//! plus the path-derived labels used by the sensor listing.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::sensor::types::{QueryError, SENSOR_BASE_PATH};

/// `{"type":"d","data":400.5}`
#[derive(Debug, Deserialize)]
struct BusctlReply {
    #[serde(rename = "type")]
    signature: String,
    data: Value,
}

/// Method call replies wrap the out-arguments in an array; property reads do not.
fn first_argument(data: Value) -> Value {
    match data {
        Value::Array(mut args) if !args.is_empty() => args.swap_remove(0),
        other => other,
    }
}

/// Parse a `get-property ... Value` reply.
/// Integer signatures are widened; a JSON `null` for a double is how busctl renders NaN.
pub fn parse_property_value(output: &str) -> Result<f64, QueryError> {
    let reply: BusctlReply = serde_json::from_str(output.trim())
        .map_err(|e| QueryError::MalformedReply(format!("invalid busctl JSON: {}", e)))?;

    match reply.signature.as_str() {
        "d" | "y" | "n" | "q" | "i" | "u" | "x" | "t" => match reply.data {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| QueryError::MalformedReply(format!("unrepresentable number {}", n))),
            Value::Null => Err(QueryError::NotANumber),
            other => Err(QueryError::MalformedReply(format!("expected number, got {}", other))),
        },
        other => Err(QueryError::MalformedReply(format!("unexpected signature '{}'", other))),
    }
}

/// Parse an object mapper `GetObject` reply (`a{sas}`) into the first owning service.
pub fn parse_get_object(output: &str) -> Result<String, QueryError> {
    let reply: BusctlReply = serde_json::from_str(output.trim())
        .map_err(|e| QueryError::MalformedReply(format!("invalid busctl JSON: {}", e)))?;

    let services: BTreeMap<String, Vec<String>> = serde_json::from_value(first_argument(reply.data))
        .map_err(|e| QueryError::MalformedReply(format!("unexpected GetObject layout: {}", e)))?;

    services
        .into_keys()
        .next()
        .ok_or_else(|| QueryError::Unreachable("no service implements the object".to_string()))
}

/// Object path -> service -> interfaces
pub type SubTree = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Parse an object mapper `GetSubTree` reply (`a{sa{sas}}`).
pub fn parse_subtree(output: &str) -> anyhow::Result<SubTree> {
    let reply: BusctlReply = serde_json::from_str(output.trim())?;
    let tree: SubTree = serde_json::from_value(first_argument(reply.data))?;
    Ok(tree)
}

/// Display unit for a sensor, derived from its type segment.
pub fn unit_display(path: &str) -> &'static str {
    match sensor_type(path) {
        "temperature" => "°C",
        "voltage" => "V",
        "power" => "W",
        "current" => "A",
        "fan_tach" => "RPM",
        "fan_pwm" => "%",
        _ => "",
    }
}

/// `/xyz/openbmc_project/sensors/power/PSU0_Output_Power` -> `PSU0_Output_Power`
pub fn sensor_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// `/xyz/openbmc_project/sensors/power/PSU0_Output_Power` -> `power`
pub fn sensor_type(path: &str) -> &str {
    path.strip_prefix(SENSOR_BASE_PATH)
        .and_then(|rest| rest.strip_prefix('/'))
        .and_then(|rest| rest.split_once('/'))
        .map(|(kind, _)| kind)
        .unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_double_property() {
        assert_eq!(parse_property_value(r#"{"type":"d","data":400.5}"#), Ok(400.5));
    }

    #[test]
    fn widens_integer_property() {
        assert_eq!(parse_property_value(r#"{"type":"x","data":-12}"#), Ok(-12.0));
    }

    #[test]
    fn null_double_is_nan() {
        assert_eq!(parse_property_value(r#"{"type":"d","data":null}"#), Err(QueryError::NotANumber));
    }

    #[test]
    fn rejects_string_property() {
        let err = parse_property_value(r#"{"type":"s","data":"400"}"#).unwrap_err();
        assert!(matches!(err, QueryError::MalformedReply(_)));

        let err = parse_property_value("Failed to get property").unwrap_err();
        assert!(matches!(err, QueryError::MalformedReply(_)));
    }

    #[test]
    fn get_object_picks_owning_service() {
        let reply = r#"{"type":"a{sas}","data":[{"xyz.openbmc_project.PSUSensor":["org.freedesktop.DBus.Properties","xyz.openbmc_project.Sensor.Value"]}]}"#;
        assert_eq!(parse_get_object(reply).unwrap(), "xyz.openbmc_project.PSUSensor");

        let empty = r#"{"type":"a{sas}","data":[{}]}"#;
        assert!(matches!(parse_get_object(empty), Err(QueryError::Unreachable(_))));
    }

    #[test]
    fn subtree_reply_maps_paths_to_services() {
        let reply = r#"{"type":"a{sa{sas}}","data":[{
            "/xyz/openbmc_project/sensors/power/PSU0_Output_Power":{"xyz.openbmc_project.PSUSensor":["xyz.openbmc_project.Sensor.Value"]},
            "/xyz/openbmc_project/sensors/temperature/CPU0_Temp":{"xyz.openbmc_project.IntelCPUSensor":["xyz.openbmc_project.Sensor.Value"]}
        }]}"#;
        let tree = parse_subtree(reply).unwrap();
        assert_eq!(tree.len(), 2);
        assert!(tree["/xyz/openbmc_project/sensors/temperature/CPU0_Temp"]
            .contains_key("xyz.openbmc_project.IntelCPUSensor"));
    }

    #[test]
    fn path_labels() {
        let path = "/xyz/openbmc_project/sensors/fan_tach/Fan0";
        assert_eq!(sensor_name(path), "Fan0");
        assert_eq!(sensor_type(path), "fan_tach");
        assert_eq!(unit_display(path), "RPM");

        assert_eq!(sensor_type("/some/other/path"), "unknown");
        assert_eq!(unit_display("/some/other/path"), "");
    }
}
