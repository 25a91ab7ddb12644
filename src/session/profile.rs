use regex_lite::Regex;
use std::fmt;
use std::str::FromStr;

use crate::error::SessionError;

/// Supported device CLI families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    AristaEos,
    CiscoIos,
}

impl FromStr for DeviceType {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "arista_eos" | "eos" => Ok(DeviceType::AristaEos),
            "cisco_ios" | "ios" => Ok(DeviceType::CiscoIos),
            other => Err(SessionError::UnsupportedDeviceType(other.to_string())),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::AristaEos => write!(f, "arista_eos"),
            DeviceType::CiscoIos => write!(f, "cisco_ios"),
        }
    }
}

impl DeviceType {
    /// Commands sent right after login so output is never paged
    pub fn session_preparation(&self) -> &'static [&'static str] {
        &["terminal length 0", "terminal width 511"]
    }

    pub fn enable_command(&self) -> &'static str {
        "enable"
    }

    pub fn config_enter_command(&self) -> &'static str {
        "configure terminal"
    }

    pub fn config_exit_command(&self) -> &'static str {
        "end"
    }

    pub fn save_command(&self) -> &'static str {
        match self {
            DeviceType::AristaEos => "copy running-config startup-config",
            DeviceType::CiscoIos => "write memory",
        }
    }

    pub fn exit_command(&self) -> &'static str {
        "exit"
    }

    /// Output fragments that mean the device refused a command
    pub fn error_markers(&self) -> &'static [&'static str] {
        &[
            "% Invalid input",
            "% Incomplete command",
            "% Ambiguous command",
            "% Unrecognized command",
            "% Error",
            "% Authorization denied",
            "% Access denied",
        ]
    }

    pub fn find_error<'a>(&self, output: &'a str) -> Option<&'a str> {
        output
            .lines()
            .map(|l| l.trim())
            .find(|l| self.error_markers().iter().any(|m| l.starts_with(m)))
    }
}

/// Compiled prompt patterns for a device type
pub struct Prompts {
    prompt: Regex,
    password: Regex,
}

impl Prompts {
    pub fn for_device(device_type: DeviceType) -> Result<Self, SessionError> {
        let prompt = match device_type {
            // sw1>  sw1#  sw1(config)#  sw1(config-if-Et1)#
            DeviceType::AristaEos | DeviceType::CiscoIos => {
                r"^[A-Za-z0-9_.-]+(\([A-Za-z0-9_./-]+\))?[>#]\s*$"
            }
        };
        Ok(Self {
            prompt: Regex::new(prompt).map_err(|e| SessionError::Pattern(e.to_string()))?,
            password: Regex::new(r"(?i)password:\s*$")
                .map_err(|e| SessionError::Pattern(e.to_string()))?,
        })
    }

    pub fn is_prompt(&self, line: &str) -> bool {
        self.prompt.is_match(line)
    }

    pub fn is_password_prompt(&self, line: &str) -> bool {
        self.password.is_match(line)
    }

    pub fn is_privileged(prompt: &str) -> bool {
        prompt.trim_end().ends_with('#')
    }

    pub fn is_config_mode(prompt: &str) -> bool {
        prompt.contains("(config")
    }
}
