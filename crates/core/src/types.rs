//! Core data types for the tyosis importer.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Volume as parsed from the input. `None` is the not-a-number sentinel
/// produced by a malformed token; it is stored verbatim as `NaN`.
pub type Volume = Option<i64>;

/// Build the outer store key for one symbol's time series.
#[inline]
pub fn storage_key(prefix: &str, symbol: &str) -> String {
    format!("{prefix}{symbol}")
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Instrument symbol.
    pub symbol: String,
    /// Raw date token, before normalization.
    pub date: String,
    /// Opening price.
    pub open: f64,
    /// Highest price.
    pub high: f64,
    /// Lowest price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Traded volume.
    pub volume: Volume,
}

impl Record {
    /// The five numeric fields stored for this record.
    pub fn ohlcv(&self) -> Ohlcv {
        Ohlcv {
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

/// Daily OHLCV values as they appear inside a stored field value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ohlcv {
    #[serde(rename = "O")]
    pub open: f64,
    #[serde(rename = "H")]
    pub high: f64,
    #[serde(rename = "L")]
    pub low: f64,
    #[serde(rename = "C")]
    pub close: f64,
    #[serde(rename = "V")]
    pub volume: Volume,
}

/// Serialized `{O,H,L,C,V}` object stored under one date field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldValue(String);

impl FieldValue {
    /// Render the five fields in `O,H,L,C,V` order, each number in its natural
    /// decimal form. Non-finite values are written as `NaN` / `Infinity`.
    pub fn encode(bar: &Ohlcv) -> Self {
        let volume = match bar.volume {
            Some(v) => v.to_string(),
            None => "NaN".to_string(),
        };
        Self(format!(
            r#"{{"O":{},"H":{},"L":{},"C":{},"V":{}}}"#,
            render_number(bar.open),
            render_number(bar.high),
            render_number(bar.low),
            render_number(bar.close),
            volume,
        ))
    }

    /// Parse the stored object back into typed fields.
    ///
    /// Values holding a `NaN` sentinel are not valid JSON and fail here.
    pub fn decode(&self) -> Result<Ohlcv> {
        Ok(serde_json::from_str(&self.0)?)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn render_number(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "Infinity".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if v == 0.0 {
        // Drop the sign of negative zero.
        "0".to_string()
    } else {
        v.to_string()
    }
}
