use std::sync::Arc;
use tracing::info;

use crate::errors::ServiceError;
use crate::storage::json_map_store::JsonMapStore;
use crate::storage::WriteMode;
use crate::admin::kv_store::AdminKvStore;

/// File-backed key-value store for Admin API keys.
/// Keeps a map of `user -> api_key` persisted as JSON; the write gate of the
/// HTTP layer checks request keys against it.
#[derive(Clone)]
pub struct ApiKeysStore {
    store: Arc<JsonMapStore<String, String>>,
}

impl ApiKeysStore {
    /// Initialize the store from the given file path. Creates the file if missing.
    pub async fn new<P: Into<std::path::PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        Self::with_mode(path, WriteMode::default()).await
    }

    /// Same as `new`, persisting with the given write mode.
    pub async fn with_mode<P: Into<std::path::PathBuf>>(path: P, mode: WriteMode) -> Result<Arc<Self>, ServiceError> {
        let store = JsonMapStore::<String, String>::with_mode(path, mode).await?;
        Ok(Arc::new(Self { store }))
    }

    /// List all entries as `(user, api_key)` pairs.
    pub async fn list(&self) -> Vec<(String, String)> {
        self.store.list().await
    }

    /// Upsert the API key for a user and persist.
    pub async fn set(&self, user: String, api_key: String) -> Result<(), ServiceError> {
        if user.trim().is_empty() || api_key.trim().is_empty() {
            return Err(ServiceError::Validation("user and api_key must be non-empty".into()));
        }
        self.store.insert(user, api_key).await
    }

    /// Delete the API key for a user; returns whether an entry existed.
    pub async fn delete(&self, user: &str) -> Result<bool, ServiceError> {
        self.store.remove(&user.to_string()).await
    }

    pub async fn user_for_key(&self, api_key: &str) -> Option<String> {
        self.store.find_key_by_value(&api_key.to_string()).await
    }

    /// Grant `user` the given key when no keys exist yet. Returns whether the
    /// key was written.
    pub async fn seed_if_empty(&self, user: &str, api_key: &str) -> Result<bool, ServiceError> {
        if self.store.len().await > 0 {
            return Ok(false);
        }
        self.set(user.to_string(), api_key.to_string()).await?;
        info!(%user, "bootstrap admin api key granted");
        Ok(true)
    }
}

#[async_trait::async_trait]
impl AdminKvStore for ApiKeysStore {
    async fn list(&self) -> Vec<(String, String)> { self.list().await }
    async fn set(&self, user: String, api_key: String) -> Result<(), ServiceError> { self.set(user, api_key).await }
    async fn delete(&self, user: &str) -> Result<bool, ServiceError> { self.delete(user).await }
    async fn user_for_key(&self, api_key: &str) -> Option<String> { self.user_for_key(api_key).await }
}
