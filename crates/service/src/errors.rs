use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Reading or parsing persisted JSON failed.
    #[error("retrieval failure: {0}")]
    Retrieval(String),
    /// Writing persisted JSON failed.
    #[error("persistence failure: {0}")]
    Persistence(String),
    /// The key-value medium behind a collection store is inaccessible or holds
    /// something other than a record array.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("record is missing a string `id`")]
    MissingId,
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }
}
