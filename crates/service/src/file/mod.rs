pub mod admin_kv_store;
