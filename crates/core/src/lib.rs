//! Core types and configuration for the tyosis importer.
//!
//! This crate provides shared types used across all other crates:
//! - Record and stored-value types
//! - Column mapping and run configuration
//! - The key-value store interface
//! - Common error types

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::{
    Column, ColumnMapping, PartialMapping, PersistedConfig, RunConfig, RunOptions, CONFIG_KEY,
    DEFAULT_DATE_FORMAT, KEY_PREFIX_FIELD,
};
pub use error::{Error, Result};
pub use store::Store;
pub use types::*;
