use serde::{Deserialize, Deserializer};
use std::path::Path;

use crate::error::InventoryError;
use crate::models::{DeviceRecord, Inventory};
use crate::utils::{is_valid_hostname, is_valid_management_address};

/// On-disk shape of the inventory document
#[derive(Debug, Deserialize)]
struct RawInventory {
    #[serde(deserialize_with = "yaml11_bool")]
    configure: bool,
    #[serde(default)]
    devices: Option<serde_yaml::Mapping>,
}

/// Accept the YAML 1.1 boolean spellings (`yes`, `on`, ...) that serde_yaml's
/// YAML 1.2 resolver leaves as strings.
fn yaml11_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Word(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Word(w) => match w.as_str() {
            "true" | "True" | "TRUE" | "yes" | "Yes" | "YES" | "on" | "On" | "ON" => Ok(true),
            "false" | "False" | "FALSE" | "no" | "No" | "NO" | "off" | "Off" | "OFF" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "configure must be a boolean, got {:?}",
                other
            ))),
        },
    }
}

/// Read and parse an inventory file
pub async fn load(path: &Path) -> Result<Inventory, InventoryError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| InventoryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let inventory = parse(&content)?;
    tracing::info!(
        "Loaded inventory {} ({} devices, configure={})",
        path.display(),
        inventory.devices.len(),
        inventory.configure
    );
    Ok(inventory)
}

/// Parse an inventory document. Devices keep their document order.
pub fn parse(content: &str) -> Result<Inventory, InventoryError> {
    let raw: RawInventory = serde_yaml::from_str(content)?;
    let mapping = raw.devices.ok_or(InventoryError::MissingDevices)?;

    let mut devices = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let hostname = match key {
            serde_yaml::Value::String(s) => s,
            other => {
                return Err(InventoryError::InvalidHostname(
                    serde_yaml::to_string(&other)
                        .map(|s| s.trim().to_string())
                        .unwrap_or_default(),
                ))
            }
        };
        devices.push(parse_device(hostname, value)?);
    }

    Ok(Inventory {
        configure: raw.configure,
        devices,
    })
}

fn parse_device(hostname: String, value: serde_yaml::Value) -> Result<DeviceRecord, InventoryError> {
    if !is_valid_hostname(&hostname) {
        return Err(InventoryError::InvalidHostname(hostname));
    }

    let management_ip = match value.get("management_ip") {
        Some(serde_yaml::Value::String(ip)) => ip.clone(),
        Some(_) => {
            return Err(InventoryError::InvalidDevice {
                hostname,
                reason: "management_ip must be a string".to_string(),
            })
        }
        None => return Err(InventoryError::MissingManagementIp(hostname)),
    };
    if !is_valid_management_address(&management_ip) {
        return Err(InventoryError::InvalidDevice {
            hostname,
            reason: format!("management_ip {:?} is not a valid address", management_ip),
        });
    }

    // Template engines want string-keyed maps
    let attributes = serde_json::to_value(&value).map_err(|e| InventoryError::InvalidDevice {
        hostname: hostname.clone(),
        reason: e.to_string(),
    })?;

    Ok(DeviceRecord {
        hostname,
        management_ip,
        attributes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
configure: true
devices:
  spine-01:
    management_ip: 10.0.0.11
    asn: 65000
    interfaces:
      - name: Ethernet1
        ip: 10.1.0.0/31
  leaf-01:
    management_ip: 10.0.0.21
    asn: 65101
  leaf-02:
    management_ip: 10.0.0.22
"#;

    #[test]
    fn test_parse_keeps_document_order() {
        let inv = parse(SAMPLE).unwrap();
        assert!(inv.configure);
        let names: Vec<&str> = inv.devices.iter().map(|d| d.hostname.as_str()).collect();
        assert_eq!(names, vec!["spine-01", "leaf-01", "leaf-02"]);
        assert_eq!(inv.devices[1].management_ip, "10.0.0.21");
    }

    #[test]
    fn test_attributes_hold_nested_structure() {
        let inv = parse(SAMPLE).unwrap();
        let spine = &inv.devices[0].attributes;
        assert_eq!(spine["asn"], 65000);
        assert_eq!(spine["management_ip"], "10.0.0.11");
        assert_eq!(spine["interfaces"][0]["name"], "Ethernet1");
    }

    #[test]
    fn test_configure_false() {
        let inv = parse("configure: false\ndevices:\n  sw1:\n    management_ip: 10.0.0.1\n").unwrap();
        assert!(!inv.configure);
        assert_eq!(inv.devices.len(), 1);
    }

    #[test]
    fn test_configure_accepts_yaml11_spellings() {
        let body = "devices:\n  sw1:\n    management_ip: 10.0.0.1\n";
        for word in ["yes", "Yes", "on", "ON", "True"] {
            assert!(parse(&format!("configure: {}\n{}", word, body)).unwrap().configure, "{}", word);
        }
        for word in ["no", "NO", "off", "Off", "false"] {
            assert!(!parse(&format!("configure: {}\n{}", word, body)).unwrap().configure, "{}", word);
        }
        let err = parse(&format!("configure: maybe\n{}", body)).unwrap_err();
        assert!(matches!(err, InventoryError::Parse(_)));
    }

    #[test]
    fn test_malformed_document_is_parse_error() {
        let err = parse("configure: [true\ndevices: {").unwrap_err();
        assert!(matches!(err, InventoryError::Parse(_)));
    }

    #[test]
    fn test_missing_configure_flag_is_parse_error() {
        let err = parse("devices:\n  sw1:\n    management_ip: 10.0.0.1\n").unwrap_err();
        assert!(matches!(err, InventoryError::Parse(_)));
    }

    #[test]
    fn test_missing_devices() {
        let err = parse("configure: true\n").unwrap_err();
        assert!(matches!(err, InventoryError::MissingDevices));
    }

    #[test]
    fn test_missing_management_ip() {
        let err = parse("configure: true\ndevices:\n  sw1:\n    asn: 1\n").unwrap_err();
        assert!(matches!(err, InventoryError::MissingManagementIp(h) if h == "sw1"));
    }

    #[test]
    fn test_null_device_entry_has_no_management_ip() {
        let err = parse("configure: true\ndevices:\n  sw1:\n").unwrap_err();
        assert!(matches!(err, InventoryError::MissingManagementIp(_)));
    }

    #[test]
    fn test_rejects_path_like_hostname() {
        let err = parse("configure: true\ndevices:\n  ../evil:\n    management_ip: 10.0.0.1\n").unwrap_err();
        assert!(matches!(err, InventoryError::InvalidHostname(_)));
    }

    #[test]
    fn test_rejects_bad_management_ip() {
        let err = parse("configure: true\ndevices:\n  sw1:\n    management_ip: 10.0.0.300\n").unwrap_err();
        assert!(matches!(err, InventoryError::InvalidDevice { .. }));

        // a leading zero would resolve as octal (8.0.0.1)
        let err = parse("configure: true\ndevices:\n  sw1:\n    management_ip: 010.0.0.1\n").unwrap_err();
        assert!(matches!(err, InventoryError::InvalidDevice { ref hostname, .. } if hostname == "sw1"));
    }

    #[test]
    fn test_duplicate_hostnames_rejected() {
        let doc = "configure: true\ndevices:\n  sw1:\n    management_ip: 10.0.0.1\n  sw1:\n    management_ip: 10.0.0.2\n";
        assert!(parse(doc).is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/inventory.yml")).await.unwrap_err();
        assert!(matches!(err, InventoryError::Read { .. }));
    }
}
