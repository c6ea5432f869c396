//! Key-value media behind the local collection store.
//!
//! The contract mirrors a browser's `localStorage`: string keys, string
//! values, whole-value reads and writes. Every backend failure surfaces as
//! `ServiceError::StoreUnavailable`.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use tokio::{fs, sync::RwLock};

use crate::errors::ServiceError;
use super::json_file::{self, WriteMode};

#[async_trait]
pub trait KvBackend: Send + Sync {
    /// `Ok(None)` when the key has never been set.
    async fn get_item(&self, key: &str) -> Result<Option<String>, ServiceError>;
    async fn set_item(&self, key: &str, value: String) -> Result<(), ServiceError>;
    async fn remove_item(&self, key: &str) -> Result<(), ServiceError>;
}

/// One file per key under a directory; survives restarts.
#[derive(Clone, Debug)]
pub struct FileBackend {
    dir: PathBuf,
    mode: WriteMode,
}

impl FileBackend {
    pub fn new<P: Into<PathBuf>>(dir: P, mode: WriteMode) -> Self {
        Self { dir: dir.into(), mode }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ServiceError> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(ServiceError::Validation(format!("unsupported storage key `{key}`")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KvBackend for FileBackend {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let path = self.path_for(key)?;
        let bytes = json_file::read_bytes(&path)
            .await
            .map_err(|e| ServiceError::StoreUnavailable(format!("read {}: {e}", path.display())))?;
        bytes
            .map(|b| {
                String::from_utf8(b)
                    .map_err(|e| ServiceError::StoreUnavailable(format!("{} is not utf-8: {e}", path.display())))
            })
            .transpose()
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), ServiceError> {
        let path = self.path_for(key)?;
        json_file::write_bytes(&path, value.as_bytes(), self.mode)
            .await
            .map_err(|e| ServiceError::StoreUnavailable(format!("write {}: {e}", path.display())))
    }

    async fn remove_item(&self, key: &str) -> Result<(), ServiceError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ServiceError::StoreUnavailable(format!("remove {}: {e}", path.display()))),
        }
    }
}

/// In-process medium with an optional byte quota, like a browser origin's
/// storage allowance. Can be switched off to simulate disabled storage.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    items: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    disabled: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self { quota_bytes: Some(quota_bytes), ..Self::default() }
    }

    pub fn set_available(&self, available: bool) {
        self.disabled.store(!available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), ServiceError> {
        if self.disabled.load(Ordering::SeqCst) {
            return Err(ServiceError::StoreUnavailable("storage is disabled".into()));
        }
        Ok(())
    }

    /// Raw write that bypasses validation; lets tests plant corrupt values.
    pub async fn put_raw(&self, key: &str, value: &str) {
        self.items.write().await.insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ServiceError> {
        self.check_available()?;
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), ServiceError> {
        self.check_available()?;
        let mut items = self.items.write().await;
        if let Some(quota) = self.quota_bytes {
            let others: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if others + key.len() + value.len() > quota {
                return Err(ServiceError::StoreUnavailable("quota exceeded".into()));
            }
        }
        items.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), ServiceError> {
        self.check_available()?;
        self.items.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_backend_round_trip_and_remove() -> Result<(), anyhow::Error> {
        let dir = std::env::temp_dir().join(format!("kv_file_{}", uuid::Uuid::new_v4()));
        let kv = FileBackend::new(&dir, WriteMode::AtomicRename);

        assert_eq!(kv.get_item("mhm_cms_bookings").await?, None);
        kv.set_item("mhm_cms_bookings", "[]".into()).await?;
        assert_eq!(kv.get_item("mhm_cms_bookings").await?.as_deref(), Some("[]"));

        // a fresh instance over the same directory sees the data
        let again = FileBackend::new(&dir, WriteMode::Overwrite);
        assert_eq!(again.get_item("mhm_cms_bookings").await?.as_deref(), Some("[]"));

        kv.remove_item("mhm_cms_bookings").await?;
        kv.remove_item("mhm_cms_bookings").await?;
        assert_eq!(kv.get_item("mhm_cms_bookings").await?, None);

        assert!(matches!(kv.get_item("../escape").await, Err(ServiceError::Validation(_))));

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn memory_backend_quota_and_disable() -> Result<(), anyhow::Error> {
        let kv = MemoryBackend::with_quota(16);
        kv.set_item("k", "0123456789".into()).await?;
        // replacing the same key only counts the new value
        kv.set_item("k", "abcdefghij".into()).await?;
        let full = kv.set_item("other", "0123456789".into()).await;
        assert!(matches!(full, Err(ServiceError::StoreUnavailable(_))));
        assert_eq!(kv.get_item("k").await?.as_deref(), Some("abcdefghij"));

        kv.set_available(false);
        assert!(matches!(kv.get_item("k").await, Err(ServiceError::StoreUnavailable(_))));
        kv.set_available(true);
        assert!(kv.get_item("k").await?.is_some());
        Ok(())
    }
}
