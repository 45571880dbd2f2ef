//! Store backends and persisted configuration for the tyosis importer.
//!
//! This crate handles:
//! - In-memory and Redis implementations of [`tyosis_core::Store`]
//! - Loading, merging and saving the `tyosis-config` record
//! - Reading back a symbol's stored series

pub mod config_store;
pub mod memory;
pub mod redis_store;
pub mod series;

pub use config_store::ConfigStore;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use series::fetch_series;
