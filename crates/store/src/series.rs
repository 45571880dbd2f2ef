//! Read-back of one symbol's stored time series.

use std::collections::BTreeMap;

use tyosis_core::{storage_key, FieldValue, Result, Store};

/// Fetch every stored date of a symbol in one lookup, ordered by field key.
pub fn fetch_series<S: Store + ?Sized>(
    store: &S,
    prefix: &str,
    symbol: &str,
) -> Result<BTreeMap<String, FieldValue>> {
    let fields = store.get_all(&storage_key(prefix, symbol))?;
    Ok(fields
        .into_iter()
        .map(|(date, value)| (date, FieldValue::from(value)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[test]
    fn test_fetch_series_is_date_ordered() {
        let store = MemoryStore::new();
        store.upsert("p:AAPL", "20200103", r#"{"O":2,"H":2,"L":2,"C":2,"V":2}"#).unwrap();
        store.upsert("p:AAPL", "20200102", r#"{"O":1,"H":1,"L":1,"C":1,"V":1}"#).unwrap();

        let series = fetch_series(&store, "p:", "AAPL").unwrap();
        let dates: Vec<&str> = series.keys().map(String::as_str).collect();
        assert_eq!(dates, vec!["20200102", "20200103"]);
        assert_eq!(series["20200102"].decode().unwrap().volume, Some(1));
    }

    #[test]
    fn test_fetch_unknown_symbol_is_empty() {
        let store = MemoryStore::new();
        assert!(fetch_series(&store, "", "NOPE").unwrap().is_empty());
    }
}
