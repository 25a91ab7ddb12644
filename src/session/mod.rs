//! Device session client: drives a device CLI over an interactive channel.
//!
//! `CliSession` works on any `Read + Write` stream (an ssh2 channel in
//! production) and walks the provisioning state machine:
//!
//! ```text
//! Idle -> Connected -> Privileged -> Configured -> Saved -> Closed
//!   \________\______________\____________\__________-> Failed -> Closed
//! ```
//!
//! Closing is tied to `Drop`, so every exit path leaves the device.

pub mod profile;
mod ssh;
mod transcript;

pub use profile::DeviceType;
pub use ssh::{SessionSettings, SshProvisioner};
pub use transcript::Transcript;

use async_trait::async_trait;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::SessionError;
use crate::models::{Credentials, DeviceRecord, PushOutcome};
use profile::Prompts;

/// Pushes a generated config file to one device.
///
/// Failures are part of the outcome, never an error: one device going wrong
/// must not stop the batch.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn push(
        &self,
        device: &DeviceRecord,
        config_file: &Path,
        credentials: &Credentials,
    ) -> PushOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connected,
    Privileged,
    Configured,
    Saved,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Matched {
    Prompt,
    Password,
}

/// Interactive CLI session with one device
pub struct CliSession<S: Read + Write> {
    stream: S,
    device_type: DeviceType,
    prompts: Prompts,
    transcript: Option<Transcript>,
    timeout: Duration,
    state: SessionState,
    prompt: String,
}

impl<S: Read + Write> CliSession<S> {
    pub fn new(
        stream: S,
        device_type: DeviceType,
        transcript: Option<Transcript>,
        timeout: Duration,
    ) -> Result<Self, SessionError> {
        Ok(Self {
            stream,
            device_type,
            prompts: Prompts::for_device(device_type)?,
            transcript,
            timeout,
            state: SessionState::Idle,
            prompt: String::new(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    #[cfg(test)]
    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Run every step from login to save. On failure the session is marked
    /// Failed and the error is returned; the caller's scope closes it.
    pub fn provision(&mut self, password: &str, commands: &[String]) -> Result<String, SessionError> {
        let result = self.provision_steps(password, commands);
        if let Err(ref e) = result {
            tracing::debug!("Session failed in state {:?}: {}", self.state, e);
            self.state = SessionState::Failed;
        }
        result
    }

    fn provision_steps(&mut self, password: &str, commands: &[String]) -> Result<String, SessionError> {
        self.establish()?;
        self.enable(password)?;
        let mut output = self.send_config_set(commands)?;
        output.push_str(&self.save_config()?);
        Ok(output)
    }

    /// Wait for the login prompt and turn off paging
    pub fn establish(&mut self) -> Result<(), SessionError> {
        self.read_until(false)?;
        self.state = SessionState::Connected;

        for cmd in self.device_type.session_preparation() {
            let output = self.command(cmd)?;
            if let Some(err) = self.device_type.find_error(&output) {
                tracing::debug!("Ignoring {:?} during session preparation: {}", cmd, err);
            }
        }
        Ok(())
    }

    /// Enter privileged mode, answering the enable password prompt if asked
    pub fn enable(&mut self, password: &str) -> Result<(), SessionError> {
        if !Prompts::is_privileged(&self.prompt) {
            self.send_line(self.device_type.enable_command())?;
            let (mut output, matched) = self.read_until(true)?;
            if matched == Matched::Password {
                self.send_line(password)?;
                output = self.read_until(false)?.0;
            }
            if !Prompts::is_privileged(&self.prompt) {
                let reason = self
                    .device_type
                    .find_error(&output)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("prompt is still {:?}", self.prompt));
                return Err(SessionError::Privilege(reason));
            }
        }
        self.state = SessionState::Privileged;
        Ok(())
    }

    /// Enter config mode, send every command line, leave config mode
    pub fn send_config_set(&mut self, commands: &[String]) -> Result<String, SessionError> {
        let enter = self.device_type.config_enter_command();
        let mut output = self.command(enter)?;
        if !Prompts::is_config_mode(&self.prompt) {
            return Err(SessionError::CommandRejected {
                command: enter.to_string(),
                output,
            });
        }

        for line in commands.iter().map(|l| l.trim_end()).filter(|l| !l.trim().is_empty()) {
            let reply = self.command(line)?;
            if let Some(err) = self.device_type.find_error(&reply) {
                return Err(SessionError::CommandRejected {
                    command: line.trim().to_string(),
                    output: err.to_string(),
                });
            }
            output.push_str(&reply);
        }

        output.push_str(&self.command(self.device_type.config_exit_command())?);
        self.state = SessionState::Configured;
        Ok(output)
    }

    /// Copy the running config to non-volatile storage
    pub fn save_config(&mut self) -> Result<String, SessionError> {
        let output = self.command(self.device_type.save_command())?;
        if let Some(err) = self.device_type.find_error(&output) {
            return Err(SessionError::Save(err.to_string()));
        }
        self.state = SessionState::Saved;
        Ok(output)
    }

    /// Leave the device. Errors are ignored: the link may already be gone.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if self.state != SessionState::Idle {
            let _ = self.send_line(self.device_type.exit_command());
        }
        self.state = SessionState::Closed;
    }

    /// Send a command and return its output without echo and prompt
    fn command(&mut self, cmd: &str) -> Result<String, SessionError> {
        tracing::debug!("> {}", cmd);
        self.send_line(cmd)?;
        let (output, _) = self.read_until(false)?;
        Ok(strip_echo_and_prompt(&output, cmd))
    }

    fn send_line(&mut self, line: &str) -> Result<(), SessionError> {
        self.stream.write_all(line.as_bytes())?;
        self.stream.write_all(b"\n")?;
        self.stream.flush()?;
        Ok(())
    }

    /// Read until the last line is a prompt (or a password prompt, if allowed)
    fn read_until(&mut self, accept_password: bool) -> Result<(String, Matched), SessionError> {
        let deadline = Instant::now() + self.timeout;
        let mut output = String::new();
        let mut buf = [0u8; 4096];

        loop {
            let last_line = output.rsplit('\n').next().unwrap_or("").trim();
            if self.prompts.is_prompt(last_line) {
                self.prompt = last_line.to_string();
                return Ok((output, Matched::Prompt));
            }
            if accept_password && self.prompts.is_password_prompt(last_line) {
                return Ok((output, Matched::Password));
            }
            if Instant::now() >= deadline {
                return Err(SessionError::Timeout(tail(&output)));
            }

            let n = match self.stream.read(&mut buf) {
                Ok(0) => {
                    return Err(SessionError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "device closed the session",
                    )))
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                    return Err(SessionError::Timeout(tail(&output)))
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(transcript) = self.transcript.as_mut() {
                transcript.record(&buf[..n]);
            }
            output.push_str(&String::from_utf8_lossy(&buf[..n]));
        }
    }
}

impl<S: Read + Write> Drop for CliSession<S> {
    fn drop(&mut self) {
        self.close();
    }
}

fn strip_echo_and_prompt(output: &str, cmd: &str) -> String {
    let mut lines: Vec<&str> = output.split('\n').map(|l| l.trim_end_matches('\r')).collect();
    // trailing prompt
    lines.pop();
    if lines.first().is_some_and(|l| l.trim().contains(cmd.trim())) {
        lines.remove(0);
    }
    let mut stripped = lines.join("\n");
    if !stripped.is_empty() {
        stripped.push('\n');
    }
    stripped
}

fn tail(output: &str) -> String {
    let trimmed = output.trim();
    let start = trimmed
        .char_indices()
        .rev()
        .nth(79)
        .map(|(i, _)| i)
        .unwrap_or(0);
    trimmed[start..].to_string()
}
