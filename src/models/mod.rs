use std::fmt;
use std::path::PathBuf;

/// Fixed administrative account used for every device session
pub const ADMIN_USERNAME: &str = "admin";

/// DeviceRecord is one inventory entry
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub hostname: String,
    pub management_ip: String,
    /// Every field of the inventory entry, passed to the template as HOST_DICT
    pub attributes: serde_json::Value,
}

/// Inventory is the parsed input document, devices kept in document order
#[derive(Debug, Clone, PartialEq)]
pub struct Inventory {
    pub configure: bool,
    pub devices: Vec<DeviceRecord>,
}

/// Shared login for all devices in a run
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn admin(password: impl Into<String>) -> Self {
        Self {
            username: ADMIN_USERNAME.to_string(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Result of pushing configuration to one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Configured,
    NotConfigured { reason: String },
}

impl PushOutcome {
    pub fn is_configured(&self) -> bool {
        matches!(self, PushOutcome::Configured)
    }
}

/// DeviceReport pairs a hostname with its push outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceReport {
    pub hostname: String,
    pub outcome: PushOutcome,
}

impl fmt::Display for DeviceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            PushOutcome::Configured => write!(f, "{} is configured", self.hostname),
            PushOutcome::NotConfigured { .. } => write!(f, "{} was not configured", self.hostname),
        }
    }
}

/// BatchReport summarizes a whole run
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// hostname -> generated config file, in inventory order
    pub config_files: Vec<(String, PathBuf)>,
    /// Empty when the inventory's configure flag is false
    pub devices: Vec<DeviceReport>,
}

impl BatchReport {
    pub fn config_file(&self, hostname: &str) -> Option<&PathBuf> {
        self.config_files
            .iter()
            .find(|(h, _)| h == hostname)
            .map(|(_, path)| path)
    }

    pub fn configured_count(&self) -> usize {
        self.devices.iter().filter(|d| d.outcome.is_configured()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.devices.len() - self.configured_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lines() {
        let ok = DeviceReport {
            hostname: "sw1".into(),
            outcome: PushOutcome::Configured,
        };
        let bad = DeviceReport {
            hostname: "sw2".into(),
            outcome: PushOutcome::NotConfigured {
                reason: "timeout".into(),
            },
        };
        assert_eq!(ok.to_string(), "sw1 is configured");
        assert_eq!(bad.to_string(), "sw2 was not configured");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::admin("s3cret");
        let dbg = format!("{:?}", creds);
        assert!(dbg.contains("admin"));
        assert!(!dbg.contains("s3cret"));
    }

    #[test]
    fn test_batch_counts() {
        let report = BatchReport {
            config_files: vec![("sw1".into(), PathBuf::from("sw1.txt"))],
            devices: vec![
                DeviceReport { hostname: "sw1".into(), outcome: PushOutcome::Configured },
                DeviceReport {
                    hostname: "sw2".into(),
                    outcome: PushOutcome::NotConfigured { reason: "x".into() },
                },
            ],
        };
        assert_eq!(report.configured_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.config_file("sw1"), Some(&PathBuf::from("sw1.txt")));
        assert_eq!(report.config_file("sw9"), None);
    }
}
