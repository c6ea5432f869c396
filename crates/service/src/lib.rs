//! Persistence layer for the results CMS.
//! - `storage::document_store`: one whole JSON document per named collection.
//! - `storage::collection_store`: keyed records over a pluggable key-value medium.
//! - `bookings`: feature wrapper that stamps ids/timestamps and computes stats.
//! - `file::admin_kv_store`: file-backed admin API keys used by the HTTP auth gate.

pub mod errors;
pub mod runtime;
pub mod storage;
pub mod bookings;
pub mod file;
pub mod admin;
