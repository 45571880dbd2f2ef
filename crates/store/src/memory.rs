//! In-process store backend.
//!
//! Used for dry runs and tests. Databases are independent keyspaces selected
//! with [`Store::select`], mirroring the Redis behaviour.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tyosis_core::{Error, Result, Store};

type Hash = HashMap<String, String>;

#[derive(Debug, Default)]
struct MemoryState {
    selected: i64,
    databases: HashMap<i64, HashMap<String, Hash>>,
}

impl MemoryState {
    fn keyspace(&self) -> Option<&HashMap<String, Hash>> {
        self.databases.get(&self.selected)
    }

    fn keyspace_mut(&mut self) -> &mut HashMap<String, Hash> {
        self.databases.entry(self.selected).or_default()
    }
}

/// Thread-safe in-memory hash store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store with database 0 selected.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| Error::store("memory store lock poisoned"))
    }

    /// Number of keys in the selected database.
    pub fn key_count(&self) -> Result<usize> {
        Ok(self.lock()?.keyspace().map_or(0, HashMap::len))
    }

    /// Keys in the selected database, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let state = self.lock()?;
        let mut keys: Vec<String> = state
            .keyspace()
            .map(|ks| ks.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }
}

impl Store for MemoryStore {
    fn select(&self, database: i64) -> Result<()> {
        if database < 0 {
            return Err(Error::store(format!("invalid database index {database}")));
        }
        self.lock()?.selected = database;
        Ok(())
    }

    fn get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let state = self.lock()?;
        Ok(state
            .keyspace()
            .and_then(|ks| ks.get(key))
            .cloned()
            .unwrap_or_default())
    }

    fn set_fields(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        if fields.is_empty() {
            return Err(Error::store(format!("no fields given for key {key}")));
        }
        let mut state = self.lock()?;
        let hash = state.keyspace_mut().entry(key.to_string()).or_default();
        for (field, value) in fields {
            hash.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    fn get_field(&self, key: &str, field: &str) -> Result<Option<String>> {
        let state = self.lock()?;
        Ok(state
            .keyspace()
            .and_then(|ks| ks.get(key))
            .and_then(|hash| hash.get(field))
            .cloned())
    }
}
