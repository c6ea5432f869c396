//! Local collection store: flat records grouped by collection, kept as one
//! JSON array per collection in a [`KvBackend`].
//!
//! Records are never touched by the store beyond what the caller asks for:
//! no id generation, no timestamps. Callers own both.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::errors::ServiceError;
use super::{kv_backend::KvBackend, name::CollectionName};

/// One stored record. Carries a string `id` once it has been saved.
pub type Record = Map<String, Value>;

/// Emitted after every successful write to a collection.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionEvent {
    pub collection: String,
    pub records: Vec<Record>,
}

pub fn record_id(record: &Record) -> Option<&str> {
    record.get("id").and_then(Value::as_str).filter(|id| !id.is_empty())
}

pub struct LocalCollectionStore {
    backend: Arc<dyn KvBackend>,
    prefix: String,
    events: broadcast::Sender<CollectionEvent>,
}

impl LocalCollectionStore {
    pub fn new(backend: Arc<dyn KvBackend>, prefix: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self { backend, prefix: prefix.into(), events }
    }

    /// Receive a [`CollectionEvent`] for every persisted change.
    pub fn subscribe(&self) -> broadcast::Receiver<CollectionEvent> {
        self.events.subscribe()
    }

    fn key(&self, collection: &str) -> Result<String, ServiceError> {
        let name = CollectionName::parse(collection)?;
        Ok(format!("{}{}", self.prefix, name))
    }

    /// Seed a collection with `defaults` if it has never been written.
    /// Returns whether seeding happened.
    pub async fn init(&self, collection: &str, defaults: Vec<Record>) -> Result<bool, ServiceError> {
        let key = self.key(collection)?;
        if self.backend.get_item(&key).await?.is_some() {
            return Ok(false);
        }
        let count = defaults.len();
        self.persist(collection, &key, defaults).await?;
        info!(collection, count, "collection initialized with defaults");
        Ok(true)
    }

    /// All records in storage order. An absent collection is empty; a stored
    /// value that is not an array of objects is an error.
    pub async fn get_all(&self, collection: &str) -> Result<Vec<Record>, ServiceError> {
        let key = self.key(collection)?;
        self.load(collection, &key).await
    }

    pub async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>, ServiceError> {
        let records = self.get_all(collection).await?;
        Ok(records.into_iter().find(|r| record_id(r) == Some(id)))
    }

    /// Upsert by `id`: a matching record is replaced where it stands,
    /// anything else is appended.
    pub async fn save(&self, collection: &str, record: Record) -> Result<Record, ServiceError> {
        let id = record_id(&record).ok_or(ServiceError::MissingId)?.to_string();
        let key = self.key(collection)?;
        let mut records = self.load(collection, &key).await?;

        match records.iter().position(|r| record_id(r) == Some(id.as_str())) {
            Some(index) => {
                records[index] = record.clone();
                debug!(collection, %id, index, "record replaced");
            }
            None => {
                records.push(record.clone());
                debug!(collection, %id, "record appended");
            }
        }

        self.persist(collection, &key, records).await?;
        Ok(record)
    }

    /// Remove the record with `id`; returns whether one was removed.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<bool, ServiceError> {
        let key = self.key(collection)?;
        let records = self.load(collection, &key).await?;
        let before = records.len();
        let kept: Vec<Record> = records.into_iter().filter(|r| record_id(r) != Some(id)).collect();
        if kept.len() == before {
            return Ok(false);
        }
        self.persist(collection, &key, kept).await?;
        debug!(collection, %id, "record deleted");
        Ok(true)
    }

    /// Drop the whole collection.
    pub async fn clear(&self, collection: &str) -> Result<(), ServiceError> {
        let key = self.key(collection)?;
        self.backend.remove_item(&key).await?;
        let _ = self.events.send(CollectionEvent { collection: collection.to_string(), records: Vec::new() });
        info!(collection, "collection cleared");
        Ok(())
    }

    async fn load(&self, collection: &str, key: &str) -> Result<Vec<Record>, ServiceError> {
        let raw = match self.backend.get_item(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(Vec::new()),
            Err(e) => {
                error!(collection, error = %e, "collection read failed");
                return Err(e);
            }
        };
        serde_json::from_str::<Vec<Record>>(&raw).map_err(|e| {
            error!(collection, error = %e, "collection holds unexpected data");
            ServiceError::StoreUnavailable(format!("collection `{collection}` is not a record array: {e}"))
        })
    }

    async fn persist(&self, collection: &str, key: &str, records: Vec<Record>) -> Result<(), ServiceError> {
        let raw = serde_json::to_string(&records)
            .map_err(|e| ServiceError::StoreUnavailable(format!("serialize `{collection}`: {e}")))?;
        if let Err(e) = self.backend.set_item(key, raw).await {
            error!(collection, error = %e, "collection write failed");
            return Err(e);
        }
        // nobody listening is fine
        let _ = self.events.send(CollectionEvent { collection: collection.to_string(), records });
        Ok(())
    }
}
