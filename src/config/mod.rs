use std::env;
use std::path::PathBuf;

/// Config holds all runtime configuration that does not come from the inventory
#[derive(Debug, Clone)]
pub struct Config {
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    pub device_type: String,
    pub ssh_port: u16,
    pub ssh_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self {
            template_path: PathBuf::from(get_env("TEMPLATE_PATH", "template.j2")),
            output_dir: PathBuf::from(get_env("OUTPUT_DIR", ".")),
            device_type: get_env("DEVICE_TYPE", "arista_eos"),
            ssh_port: get_env("SSH_PORT", "22").parse().unwrap_or(22),
            ssh_timeout_secs: get_env("SSH_TIMEOUT", "30").parse().unwrap_or(30),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from("template.j2"),
            output_dir: PathBuf::from("."),
            device_type: "arista_eos".to_string(),
            ssh_port: 22,
            ssh_timeout_secs: 30,
        }
    }
}

/// Admin password for unattended runs. Never taken from argv.
pub fn admin_password() -> Option<String> {
    env::var("NETPROV_PASSWORD").ok()
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
