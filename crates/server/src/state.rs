use std::sync::Arc;

use service::{
    admin::kv_store::AdminKvStore,
    bookings::BookingsManager,
    storage::document_store::DocumentStore,
};

/// Everything a handler can reach. Built once by the application root and
/// cloned into each request.
#[derive(Clone)]
pub struct ServerState {
    pub documents: Arc<DocumentStore>,
    pub bookings: Arc<BookingsManager>,
    pub api_keys: Arc<dyn AdminKvStore>,
    /// When off, mutating routes skip the API key check.
    pub require_api_key_for_writes: bool,
}
