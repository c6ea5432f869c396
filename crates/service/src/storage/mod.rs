//! Storage abstractions for service layer
//!
//! Contains reusable file-backed stores and helpers to avoid duplication
//! across services that persist JSON to disk.

pub mod json_file;
pub mod name;
pub mod json_map_store;
pub mod document_store;
pub mod kv_backend;
pub mod collection_store;

pub use json_file::WriteMode;
pub use name::CollectionName;
