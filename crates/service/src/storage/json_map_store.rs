use std::{collections::HashMap, hash::Hash, path::PathBuf, sync::Arc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::errors::ServiceError;
use super::json_file::{self, WriteMode};

/// Generic JSON file-backed key-value map store.
///
/// Keeps a `HashMap<K, V>` in memory and rewrites the whole file after every
/// mutation. A file that exists but does not parse is reported, not replaced.
#[derive(Clone)]
pub struct JsonMapStore<K, V> {
    inner: Arc<RwLock<HashMap<K, V>>>,
    file_path: PathBuf,
    mode: WriteMode,
}

impl<K, V> JsonMapStore<K, V>
where
    K: Eq + Hash + serde::Serialize + serde::de::DeserializeOwned + Clone,
    V: serde::Serialize + serde::de::DeserializeOwned + Clone + PartialEq,
{
    /// Initialize the store from a path. Creates the file with an empty map if missing.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        Self::with_mode(path, WriteMode::default()).await
    }

    pub async fn with_mode<P: Into<PathBuf>>(path: P, mode: WriteMode) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        let map: HashMap<K, V> = match json_file::read_json(&file_path).await? {
            Some(map) => map,
            None => {
                let empty: HashMap<K, V> = HashMap::new();
                json_file::write_json(&file_path, &empty, mode).await?;
                info!(path = %file_path.display(), "initialized empty json map store");
                empty
            }
        };

        Ok(Arc::new(Self { inner: Arc::new(RwLock::new(map)), file_path, mode }))
    }

    async fn save(&self, map: &HashMap<K, V>) -> Result<(), ServiceError> {
        json_file::write_json(&self.file_path, map, self.mode).await?;
        debug!(path = %self.file_path.display(), entries = map.len(), "json map store persisted");
        Ok(())
    }

    /// List all entries as `(key, value)` pairs.
    pub async fn list(&self) -> Vec<(K, V)> {
        let map = self.inner.read().await;
        map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Insert or update a value by key and persist.
    pub async fn insert(&self, key: K, value: V) -> Result<(), ServiceError> {
        let mut map = self.inner.write().await;
        map.insert(key, value);
        self.save(&map).await
    }

    /// Remove a key and persist; returns whether it existed.
    pub async fn remove(&self, key: &K) -> Result<bool, ServiceError> {
        let mut map = self.inner.write().await;
        let existed = map.remove(key).is_some();
        if existed {
            self.save(&map).await?;
        }
        Ok(existed)
    }

    /// First key whose value equals the given value.
    pub async fn find_key_by_value(&self, value: &V) -> Option<K> {
        let map = self.inner.read().await;
        map.iter().find(|(_, v)| *v == value).map(|(k, _)| k.clone())
    }
}
