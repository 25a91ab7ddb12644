use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Session log file name for a device
pub fn session_log_filename(hostname: &str) -> String {
    format!("{}_session.log", hostname)
}

/// Append-only record of everything the device sent during a session.
/// The device echoes commands back, so sent lines show up without logging
/// writes (and the enable password, which is not echoed, never does).
pub struct Transcript {
    path: PathBuf,
    writer: BufWriter<File>,
    failed: bool,
}

impl Transcript {
    pub fn open(dir: &Path, hostname: &str, address: &str) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(session_log_filename(hostname));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut transcript = Self {
            path,
            writer: BufWriter::new(file),
            failed: false,
        };
        let header = format!(
            "\n===== {} session to {} ({}) =====\n",
            chrono::Utc::now().to_rfc3339(),
            hostname,
            address
        );
        transcript.record(header.as_bytes());
        Ok(transcript)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write bytes to the log. A failing log never breaks the session.
    pub fn record(&mut self, bytes: &[u8]) {
        if self.failed {
            return;
        }
        if let Err(e) = self.writer.write_all(bytes) {
            tracing::warn!("Session log {} unwritable: {}", self.path.display(), e);
            self.failed = true;
        }
    }
}

impl Drop for Transcript {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
