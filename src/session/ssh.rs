use async_trait::async_trait;
use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::{CliSession, DeviceType, Provisioner, Transcript};
use crate::config::Config;
use crate::error::SessionError;
use crate::models::{Credentials, DeviceRecord, PushOutcome};

/// Keyboard-interactive prompt handler that always responds with the password
struct PasswordPrompt {
    password: String,
}

impl ssh2::KeyboardInteractivePrompt for PasswordPrompt {
    fn prompt<'a>(
        &mut self,
        _username: &str,
        _instructions: &str,
        prompts: &[ssh2::Prompt<'a>],
    ) -> Vec<String> {
        prompts.iter().map(|_| self.password.clone()).collect()
    }
}

/// Transport settings shared by every device in a run
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub device_type: DeviceType,
    pub port: u16,
    pub timeout: Duration,
    pub log_dir: PathBuf,
}

impl SessionSettings {
    pub fn from_config(cfg: &Config) -> Result<Self, SessionError> {
        Ok(Self {
            device_type: cfg.device_type.parse()?,
            port: cfg.ssh_port,
            timeout: Duration::from_secs(cfg.ssh_timeout_secs),
            log_dir: cfg.output_dir.clone(),
        })
    }
}

/// Provisioner that applies config files over SSH using ssh2 (libssh2)
#[derive(Clone)]
pub struct SshProvisioner {
    settings: Arc<SessionSettings>,
}

impl SshProvisioner {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }
}

#[async_trait]
impl Provisioner for SshProvisioner {
    async fn push(
        &self,
        device: &DeviceRecord,
        config_file: &Path,
        credentials: &Credentials,
    ) -> PushOutcome {
        let host = device.hostname.clone();
        let address = device.management_ip.clone();
        let config_file = config_file.to_path_buf();
        let credentials = credentials.clone();
        let settings = self.settings.clone();

        tracing::info!("Configuring {} ({}) as {}", host, address, credentials.username);

        let result = tokio::task::spawn_blocking(move || {
            push_blocking(&host, &address, &config_file, &credentials, &settings)
        })
        .await;

        match result {
            Ok(result) => settle(&device.hostname, result, &mut std::io::stdout().lock()),
            Err(e) => {
                tracing::error!("Push task for {} failed: {}", device.hostname, e);
                PushOutcome::NotConfigured {
                    reason: format!("Task join error: {}", e),
                }
            }
        }
    }
}

/// Turn a session result into an outcome. The device's answer to the config
/// set and save, or the failure, is echoed to `out` for the operator.
fn settle(hostname: &str, result: Result<String, SessionError>, out: &mut impl Write) -> PushOutcome {
    match result {
        Ok(output) => {
            let _ = writeln!(out, "{}", output.trim_end());
            PushOutcome::Configured
        }
        Err(e) => {
            tracing::warn!("Push to {} failed: {}", hostname, e);
            let _ = writeln!(out, "{}", e);
            PushOutcome::NotConfigured {
                reason: e.to_string(),
            }
        }
    }
}

/// Owns the SSH connection for one device. Dropping it leaves the CLI,
/// closes the channel and disconnects, whatever state the session is in.
struct SshSession {
    cli: CliSession<ssh2::Channel>,
    session: ssh2::Session,
}

impl Drop for SshSession {
    fn drop(&mut self) {
        tracing::debug!("Closing session in state {:?}", self.cli.state());
        self.cli.close();
        let channel = self.cli.stream_mut();
        let _ = channel.send_eof();
        let _ = channel.close();
        let _ = self.session.disconnect(None, "provisioning session closed", None);
    }
}

/// Connect, configure and save one device. Blocking: run via spawn_blocking.
fn push_blocking(
    host: &str,
    address: &str,
    config_file: &Path,
    credentials: &Credentials,
    settings: &SessionSettings,
) -> Result<String, SessionError> {
    let commands = read_commands(config_file)?;

    let mut transcript = match Transcript::open(&settings.log_dir, host, address) {
        Ok(t) => {
            tracing::debug!("Session log: {}", t.path().display());
            Some(t)
        }
        Err(e) => {
            tracing::warn!("Could not open session log for {}: {}", host, e);
            None
        }
    };

    let session = match connect(address, settings.port, credentials, settings.timeout) {
        Ok(session) => session,
        Err(e) => {
            if let Some(t) = transcript.as_mut() {
                t.record(format!("connection failed: {}\n", e).as_bytes());
            }
            return Err(e);
        }
    };
    println!("Connected to {}", host);

    let channel = open_shell(&session)?;
    let cli = CliSession::new(channel, settings.device_type, transcript, settings.timeout)?;
    let mut ssh = SshSession { cli, session };

    ssh.cli.provision(&credentials.password, &commands)
}

/// Read the command set from a generated config file
fn read_commands(path: &Path) -> Result<Vec<String>, SessionError> {
    let content = std::fs::read_to_string(path).map_err(|source| SessionError::ConfigFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Create an SSH session and authenticate with password + keyboard-interactive.
fn connect(
    address: &str,
    port: u16,
    credentials: &Credentials,
    timeout: Duration,
) -> Result<ssh2::Session, SessionError> {
    let target = format!("{}:{}", address, port);
    let addrs: Vec<_> = (address, port)
        .to_socket_addrs()
        .map_err(|e| SessionError::Connect {
            addr: target.clone(),
            message: e.to_string(),
        })?
        .collect();

    let mut last_error = format!("{} did not resolve", address);
    let mut tcp = None;
    for addr in &addrs {
        match TcpStream::connect_timeout(addr, timeout) {
            Ok(stream) => {
                tcp = Some(stream);
                break;
            }
            Err(e) => last_error = e.to_string(),
        }
    }
    let tcp = tcp.ok_or(SessionError::Connect {
        addr: target,
        message: last_error,
    })?;

    tcp.set_read_timeout(Some(timeout)).ok();
    tcp.set_write_timeout(Some(timeout)).ok();

    let mut session = ssh2::Session::new().map_err(|e| SessionError::Handshake(e.to_string()))?;
    session.set_tcp_stream(tcp);
    session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
    session
        .handshake()
        .map_err(|e| SessionError::Handshake(e.to_string()))?;

    // Try password auth first
    match session.userauth_password(&credentials.username, &credentials.password) {
        Ok(_) if session.authenticated() => return Ok(session),
        _ => {}
    }

    // Try keyboard-interactive auth (needed for Arista EOS and similar)
    let mut prompter = PasswordPrompt {
        password: credentials.password.clone(),
    };
    let _ = session.userauth_keyboard_interactive(&credentials.username, &mut prompter);

    if session.authenticated() {
        Ok(session)
    } else {
        Err(SessionError::Auth(credentials.username.clone()))
    }
}

/// Open an interactive shell with a PTY (network CLIs need one)
fn open_shell(session: &ssh2::Session) -> Result<ssh2::Channel, SessionError> {
    let mut channel = session.channel_session()?;
    channel.request_pty("vt100", None, Some((511, 24, 0, 0)))?;
    channel.shell()?;
    Ok(channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(hostname: &str, ip: &str) -> DeviceRecord {
        DeviceRecord {
            hostname: hostname.to_string(),
            management_ip: ip.to_string(),
            attributes: serde_json::json!({ "management_ip": ip }),
        }
    }

    fn settings(dir: &Path) -> SessionSettings {
        SessionSettings {
            device_type: DeviceType::AristaEos,
            // nothing listens on port 1
            port: 1,
            timeout: Duration::from_secs(2),
            log_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_settings_from_config() {
        let cfg = Config::default();
        let s = SessionSettings::from_config(&cfg).unwrap();
        assert_eq!(s.device_type, DeviceType::AristaEos);
        assert_eq!(s.port, 22);
        assert_eq!(s.timeout, Duration::from_secs(30));

        let bad = Config {
            device_type: "juniper_junos".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            SessionSettings::from_config(&bad),
            Err(SessionError::UnsupportedDeviceType(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_device_is_not_configured() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("sw1.txt");
        std::fs::write(&config_file, "hostname sw1\n").unwrap();

        let provisioner = SshProvisioner::new(settings(dir.path()));
        let outcome = provisioner
            .push(&device("sw1", "127.0.0.1"), &config_file, &Credentials::admin("pw"))
            .await;

        assert!(matches!(outcome, PushOutcome::NotConfigured { ref reason } if reason.contains("127.0.0.1:1")));
        let log = std::fs::read_to_string(dir.path().join("sw1_session.log")).unwrap();
        assert!(log.contains("connection failed"));
    }

    #[tokio::test]
    async fn test_missing_config_file_is_not_configured() {
        let dir = tempfile::tempdir().unwrap();
        let provisioner = SshProvisioner::new(settings(dir.path()));
        let outcome = provisioner
            .push(
                &device("sw1", "127.0.0.1"),
                &dir.path().join("missing.txt"),
                &Credentials::admin("pw"),
            )
            .await;

        assert!(matches!(outcome, PushOutcome::NotConfigured { ref reason } if reason.contains("missing.txt")));
    }

    #[test]
    fn test_settle_echoes_device_output() {
        let mut out = Vec::new();
        let output = "interface Ethernet1\nCopy completed successfully.\n".to_string();
        let outcome = settle("sw1", Ok(output), &mut out);

        assert_eq!(outcome, PushOutcome::Configured);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "interface Ethernet1\nCopy completed successfully.\n"
        );
    }

    #[test]
    fn test_settle_echoes_failure() {
        let mut out = Vec::new();
        let outcome = settle("sw1", Err(SessionError::Auth("admin".into())), &mut out);

        let printed = String::from_utf8(out).unwrap();
        assert!(matches!(outcome, PushOutcome::NotConfigured { ref reason } if printed.trim_end() == reason));
    }

    #[test]
    fn test_read_commands_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sw1.txt");
        std::fs::write(&path, "hostname sw1\ninterface Ethernet1\n   no shutdown\n").unwrap();
        assert_eq!(
            read_commands(&path).unwrap(),
            vec!["hostname sw1", "interface Ethernet1", "   no shutdown"]
        );
    }
}
