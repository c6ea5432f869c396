//! Whole-document JSON persistence: one value per collection, stored as
//! `<data_dir>/<name>.json`.
//!
//! Writes replace the entire value; there is no merge or patch. No locking
//! is done across calls, so two writers racing on one collection resolve as
//! last-write-wins.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::errors::ServiceError;
use super::{json_file::{self, WriteMode}, name::CollectionName};

#[derive(Clone, Debug)]
pub struct DocumentStore {
    data_dir: PathBuf,
    mode: WriteMode,
}

impl DocumentStore {
    pub fn new<P: Into<PathBuf>>(data_dir: P, mode: WriteMode) -> Self {
        Self { data_dir: data_dir.into(), mode }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, name: &CollectionName) -> PathBuf {
        self.data_dir.join(format!("{}.json", name.as_str()))
    }

    /// Stored value, or `None` if the collection was never written.
    #[instrument(skip(self), fields(collection = %name))]
    pub async fn read(&self, name: &CollectionName) -> Result<Option<Value>, ServiceError> {
        let path = self.path_for(name);
        let value = json_file::read_json::<Value>(&path).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "document read failed");
            e
        })?;
        debug!(found = value.is_some(), "document read");
        Ok(value)
    }

    /// Stored value, or an empty array if the collection was never written.
    pub async fn get(&self, name: &CollectionName) -> Result<Value, ServiceError> {
        Ok(self.read(name).await?.unwrap_or_else(|| Value::Array(Vec::new())))
    }

    /// Replace the collection's value, creating the data directory if needed.
    #[instrument(skip(self, value), fields(collection = %name))]
    pub async fn put(&self, name: &CollectionName, value: &Value) -> Result<(), ServiceError> {
        let path = self.path_for(name);
        json_file::write_json(&path, value, self.mode).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "document write failed");
            e
        })?;
        debug!(mode = ?self.mode, "document replaced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(mode: WriteMode) -> DocumentStore {
        let dir = std::env::temp_dir().join(format!("docs_{}", uuid::Uuid::new_v4()));
        DocumentStore::new(dir.join("data"), mode)
    }

    fn name(raw: &str) -> CollectionName {
        CollectionName::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn never_written_collection_is_empty_array() -> Result<(), anyhow::Error> {
        let docs = store(WriteMode::AtomicRename);
        assert_eq!(docs.get(&name("results")).await?, json!([]));
        assert!(docs.read(&name("results")).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn put_then_get_replaces_whole_value() -> Result<(), anyhow::Error> {
        for mode in [WriteMode::AtomicRename, WriteMode::Overwrite] {
            let docs = store(mode);
            let results = name("results");

            docs.put(&results, &json!([{"a": 1}])).await?;
            assert_eq!(docs.get(&results).await?, json!([{"a": 1}]));

            docs.put(&results, &json!([])).await?;
            assert_eq!(docs.get(&results).await?, json!([]));

            let obj = json!({"exams": [{"results": [{"reg": "A1", "total": 480}]}], "meta": null});
            docs.put(&results, &obj).await?;
            assert_eq!(docs.get(&results).await?, obj);

            let _ = tokio::fs::remove_dir_all(docs.data_dir()).await;
        }
        Ok(())
    }

    #[tokio::test]
    async fn collections_are_independent_files() -> Result<(), anyhow::Error> {
        let docs = store(WriteMode::AtomicRename);
        let military = name(CollectionName::MILITARY_RESULTS);
        let published = name(CollectionName::PUBLISHED_RESULTS);

        docs.put(&military, &json!({"side": "m"})).await?;
        assert_eq!(docs.get(&published).await?, json!([]));
        assert!(docs.path_for(&military).ends_with("military-results.json"));
        assert!(tokio::fs::metadata(docs.path_for(&military)).await?.is_file());

        let _ = tokio::fs::remove_dir_all(docs.data_dir()).await;
        Ok(())
    }

    #[tokio::test]
    async fn unparseable_document_is_retrieval_failure() -> Result<(), anyhow::Error> {
        let docs = store(WriteMode::Overwrite);
        let results = name("results");
        tokio::fs::create_dir_all(docs.data_dir()).await?;
        tokio::fs::write(docs.path_for(&results), b"{\"truncated\": [").await?;

        assert!(matches!(docs.get(&results).await, Err(ServiceError::Retrieval(_))));

        let _ = tokio::fs::remove_dir_all(docs.data_dir()).await;
        Ok(())
    }

    #[tokio::test]
    async fn unwritable_location_is_persistence_failure() -> Result<(), anyhow::Error> {
        // data_dir points below a regular file, so create_dir_all fails
        let base = std::env::temp_dir().join(format!("docs_blocker_{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&base, b"file").await?;
        let docs = DocumentStore::new(base.join("data"), WriteMode::AtomicRename);

        let res = docs.put(&name("results"), &json!([1])).await;
        assert!(matches!(res, Err(ServiceError::Persistence(_))));

        let _ = tokio::fs::remove_file(&base).await;
        Ok(())
    }
}
