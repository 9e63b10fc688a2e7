//! Whole-file JSON reads and atomic writes.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// Outcome of reading a JSON store from disk.
pub(crate) enum Loaded<T> {
    /// No file yet
    Missing,
    Parsed(T),
    /// File exists but does not parse; carries the parse error
    Corrupt(String),
}

pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<Loaded<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Loaded::Missing),
        Err(e) => return Err(e.into()),
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Loaded::Missing);
    }

    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(Loaded::Parsed(value)),
        Err(e) => Ok(Loaded::Corrupt(e.to_string())),
    }
}

/// Write pretty JSON next to `path` and rename it into place.
pub(crate) async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;

    debug!(path = %path.display(), bytes = bytes.len(), "Wrote JSON store");
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

pub(crate) fn corrupt(path: &Path, message: String) -> StorageError {
    StorageError::Corrupt {
        path: path.to_path_buf(),
        message,
    }
}
