use std::path::{Path, PathBuf};

use crate::error::GenerateError;

/// Config file name for a device
pub fn config_filename(hostname: &str) -> String {
    format!("{}.txt", hostname)
}

/// Write config lines to `<dir>/<hostname>.txt`, one newline after each line.
/// Replaces any existing file and returns its path.
pub async fn write_config_file(
    dir: &Path,
    hostname: &str,
    lines: &[String],
) -> Result<PathBuf, GenerateError> {
    let path = dir.join(config_filename(hostname));

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| GenerateError::Write {
            path: path.clone(),
            source,
        })?;

    let mut content = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }

    tokio::fs::write(&path, content)
        .await
        .map_err(|source| GenerateError::Write {
            path: path.clone(),
            source,
        })?;

    tracing::debug!("Wrote {} lines to {}", lines.len(), path.display());
    Ok(path)
}
