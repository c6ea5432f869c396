//! Shared JSON file plumbing: read-if-present, ensure parent directory,
//! pretty-printed writes with an optional temp-file + rename replace.

use std::{io, path::{Path, PathBuf}};

use serde::{de::DeserializeOwned, Serialize};
use tokio::{fs, io::AsyncWriteExt};
use tracing::warn;

use crate::errors::ServiceError;

/// How a file is replaced on write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Write a sibling temp file, fsync it, then rename over the target.
    /// Readers see either the old or the new content, never a truncated file.
    #[default]
    AtomicRename,
    /// Truncate and rewrite the target in place. A crash mid-write can leave
    /// a truncated file behind.
    Overwrite,
}

impl WriteMode {
    pub fn from_atomic(atomic: bool) -> Self {
        if atomic { Self::AtomicRename } else { Self::Overwrite }
    }
}

/// Read a file, mapping "does not exist" to `None`.
pub async fn read_bytes(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Read and parse a JSON file. Missing file is `Ok(None)`; unreadable or
/// unparseable content is a retrieval failure.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ServiceError> {
    let bytes = read_bytes(path)
        .await
        .map_err(|e| ServiceError::Retrieval(format!("read {}: {e}", path.display())))?;
    match bytes {
        None => Ok(None),
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ServiceError::Retrieval(format!("parse {}: {e}", path.display()))),
    }
}

/// Serialize `value` with two-space indentation and write it as the whole
/// content of `path`, creating parent directories first.
pub async fn write_json<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    mode: WriteMode,
) -> Result<(), ServiceError> {
    let data = serde_json::to_vec_pretty(value)
        .map_err(|e| ServiceError::Persistence(format!("serialize {}: {e}", path.display())))?;
    write_bytes(path, &data, mode)
        .await
        .map_err(|e| ServiceError::Persistence(format!("write {}: {e}", path.display())))
}

/// Raw write used by both JSON documents and the file key-value backend.
pub async fn write_bytes(path: &Path, data: &[u8], mode: WriteMode) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    match mode {
        WriteMode::Overwrite => fs::write(path, data).await,
        WriteMode::AtomicRename => {
            let tmp = temp_sibling(path);
            let written: io::Result<()> = async {
                let mut file = fs::File::create(&tmp).await?;
                file.write_all(data).await?;
                file.sync_all().await?;
                fs::rename(&tmp, path).await
            }
            .await;
            if written.is_err() {
                if let Err(e) = fs::remove_file(&tmp).await {
                    if e.kind() != io::ErrorKind::NotFound {
                        warn!(path = %tmp.display(), error = %e, "failed to remove temp file");
                    }
                }
            }
            written
        }
    }
}

// Unique per write so concurrent writers never share a temp file.
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
}
