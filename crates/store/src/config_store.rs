//! Persisted "last used settings" record.
//!
//! Every run loads the `tyosis-config` hash, merges it with its own options
//! and writes the merged result back before importing anything. Concurrent
//! runs race on this record; the last writer wins.

use std::collections::HashMap;

use tracing::{info, warn};
use tyosis_core::{
    Column, PersistedConfig, Result, RunConfig, RunOptions, Store, CONFIG_KEY, KEY_PREFIX_FIELD,
};

/// Load / merge / save access to the persisted configuration.
pub struct ConfigStore<'a, S: Store + ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> ConfigStore<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &'a S {
        self.store
    }

    /// Read the persisted settings. A missing record yields empty settings.
    pub fn load(&self) -> Result<PersistedConfig> {
        let fields = self.store.get_all(CONFIG_KEY)?;
        Ok(parse_persisted(&fields))
    }

    /// Merge the run's options over the persisted settings.
    pub fn merge(&self, options: &RunOptions, persisted: &PersistedConfig) -> RunConfig {
        RunConfig::merge(options, persisted)
    }

    /// Overwrite the record with all seven indices and the prefix.
    pub fn save(&self, config: &RunConfig) -> Result<()> {
        self.store.set_fields(CONFIG_KEY, &config.persisted_fields())
    }

    /// Load, merge and save in one step, returning the frozen run config.
    pub fn prepare(&self, options: &RunOptions) -> Result<RunConfig> {
        let persisted = self.load()?;
        let config = self.merge(options, &persisted);
        self.save(&config)?;
        info!(
            "Using key prefix '{}', mapping {:?}",
            config.key_prefix, config.mapping
        );
        Ok(config)
    }
}

/// Persisted zero indices count as unset, so a default always beats a stored 0.
fn parse_persisted(fields: &HashMap<String, String>) -> PersistedConfig {
    let mut persisted = PersistedConfig {
        key_prefix: fields
            .get(KEY_PREFIX_FIELD)
            .filter(|p| !p.is_empty())
            .cloned(),
        ..Default::default()
    };

    for column in Column::ALL {
        let Some(raw) = fields.get(column.key()) else {
            continue;
        };
        match raw.trim().parse::<usize>() {
            Ok(0) => {}
            Ok(index) => persisted.mapping.set(column, Some(index)),
            Err(_) => warn!(
                "Ignoring malformed persisted {} value '{}'",
                column.key(),
                raw
            ),
        }
    }

    persisted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use tyosis_core::{ColumnMapping, PartialMapping};

    fn seed(store: &MemoryStore, fields: &[(&str, &str)]) {
        let fields: Vec<(String, String)> = fields
            .iter()
            .map(|(f, v)| (f.to_string(), v.to_string()))
            .collect();
        store.set_fields(CONFIG_KEY, &fields).unwrap();
    }

    #[test]
    fn test_load_missing_record_is_empty() {
        let store = MemoryStore::new();
        let persisted = ConfigStore::new(&store).load().unwrap();
        assert_eq!(persisted, PersistedConfig::default());
    }

    #[test]
    fn test_load_parses_fields() {
        let store = MemoryStore::new();
        seed(
            &store,
            &[
                ("key-prefix", "asx:"),
                ("symbol-index", "0"),
                ("date-index", "2"),
                ("open-index", "oops"),
                ("volume-index", "8"),
            ],
        );

        let persisted = ConfigStore::new(&store).load().unwrap();
        assert_eq!(persisted.key_prefix.as_deref(), Some("asx:"));
        assert_eq!(persisted.mapping.symbol, None);
        assert_eq!(persisted.mapping.date, Some(2));
        assert_eq!(persisted.mapping.open, None);
        assert_eq!(persisted.mapping.volume, Some(8));
    }

    #[test]
    fn test_empty_persisted_prefix_is_unset() {
        let store = MemoryStore::new();
        seed(&store, &[("key-prefix", "")]);
        assert_eq!(ConfigStore::new(&store).load().unwrap().key_prefix, None);
    }

    #[test]
    fn test_prepare_merges_and_saves() {
        let store = MemoryStore::new();
        seed(&store, &[("key-prefix", "asx:"), ("close-index", "9")]);

        let options = RunOptions {
            overrides: PartialMapping {
                open: Some(7),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = ConfigStore::new(&store).prepare(&options).unwrap();
        assert_eq!(config.key_prefix, "asx:");
        assert_eq!(config.mapping.open, 7);
        assert_eq!(config.mapping.close, 9);
        assert_eq!(config.mapping.date, ColumnMapping::default().date);

        let saved = store.get_all(CONFIG_KEY).unwrap();
        assert_eq!(saved.len(), 8);
        assert_eq!(saved["open-index"], "7");
        assert_eq!(saved["close-index"], "9");
        assert_eq!(saved["symbol-index"], "0");
    }

    #[test]
    fn test_saved_settings_carry_into_next_run() {
        let store = MemoryStore::new();
        let first = RunOptions {
            key_prefix: Some("lse:".into()),
            overrides: PartialMapping {
                date: Some(3),
                ..Default::default()
            },
            ..Default::default()
        };
        ConfigStore::new(&store).prepare(&first).unwrap();

        let second = ConfigStore::new(&store).prepare(&RunOptions::default()).unwrap();
        assert_eq!(second.key_prefix, "lse:");
        assert_eq!(second.mapping.date, 3);
    }
}
