use std::path::PathBuf;
use thiserror::Error;

/// Fatal problems with the inventory document. Raised before any device work starts.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to read inventory {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse inventory: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("inventory has no devices mapping")]
    MissingDevices,

    #[error("invalid hostname {0:?}: only letters, digits, '.', '-' and '_' are allowed")]
    InvalidHostname(String),

    #[error("device {0} has no management_ip")]
    MissingManagementIp(String),

    #[error("device {hostname} is invalid: {reason}")]
    InvalidDevice { hostname: String, reason: String },
}

/// Errors from the generation phase (template and config file output).
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("template not found: {}", path.display())]
    TemplateNotFound { path: PathBuf },

    #[error("failed to read template {}: {source}", path.display())]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid template: {0}")]
    TemplateSyntax(String),

    #[error("template rendering failed for {hostname}: {message}")]
    TemplateRender { hostname: String, message: String },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that goes wrong while talking to a single device.
///
/// These never leave the session layer as errors; they are folded into
/// `PushOutcome::NotConfigured`.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("TCP connection to {addr} failed: {message}")]
    Connect { addr: String, message: String },

    #[error("SSH handshake failed: {0}")]
    Handshake(String),

    #[error("SSH authentication failed for user {0}")]
    Auth(String),

    #[error("timed out waiting for prompt, last output: {0:?}")]
    Timeout(String),

    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not enter privileged mode: {0}")]
    Privilege(String),

    #[error("command {command:?} rejected: {output}")]
    CommandRejected { command: String, output: String },

    #[error("saving configuration failed: {0}")]
    Save(String),

    #[error("cannot read config file {}: {source}", path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported device type: {0}")]
    UnsupportedDeviceType(String),

    #[error("invalid prompt pattern: {0}")]
    Pattern(String),
}

impl From<ssh2::Error> for SessionError {
    fn from(err: ssh2::Error) -> Self {
        match err.code() {
            // LIBSSH2_ERROR_TIMEOUT
            ssh2::ErrorCode::Session(-9) => SessionError::Timeout(err.message().to_string()),
            _ => SessionError::Io(err.into()),
        }
    }
}
