//! Key-value store interface.
//!
//! The importer talks to a hash-per-key store: each outer key holds a set of
//! field/value string pairs. Implementations must be safe to share between the
//! threads that import different sources.

use std::collections::HashMap;

use crate::error::Result;

pub trait Store: Send + Sync {
    /// Switch to the given logical database.
    fn select(&self, database: i64) -> Result<()>;

    /// All fields of a key. A missing key yields an empty map.
    fn get_all(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Insert or overwrite several fields of a key.
    fn set_fields(&self, key: &str, fields: &[(String, String)]) -> Result<()>;

    /// One field of a key, if present.
    fn get_field(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Insert or overwrite a single field.
    fn upsert(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.set_fields(key, &[(field.to_string(), value.to_string())])
    }
}
