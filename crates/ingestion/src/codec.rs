//! Line decoding and stored-value encoding.
//!
//! Lines are split on commas with no quoting or escaping support. Numeric
//! columns are parsed permissively: a malformed token becomes a NaN sentinel
//! that is stored as-is rather than failing the run.

use tyosis_core::{ColumnMapping, FieldValue, Record, Volume};

/// Words whose presence marks a header row.
const HEADER_WORDS: &[&str] = &["date", "open", "high", "low", "close", "volume"];

/// Why a line produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Empty or whitespace-only line.
    Blank,
    /// Column-name row at the top of a source.
    Header,
    /// No token at the date index.
    MissingDate,
    /// No token at the symbol index.
    MissingSymbol,
}

/// Outcome of decoding one line.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Record(Record),
    Skip(SkipReason),
}

/// Decodes lines according to a frozen column mapping.
#[derive(Debug, Clone)]
pub struct RecordCodec {
    mapping: ColumnMapping,
}

impl RecordCodec {
    pub fn new(mapping: ColumnMapping) -> Self {
        Self { mapping }
    }

    /// Split a line into a record. Symbol and date tokens are kept exactly as
    /// they appear between the commas; only numeric tokens are trimmed.
    pub fn decode(&self, line: &str) -> Decoded {
        if line.trim().is_empty() {
            return Decoded::Skip(SkipReason::Blank);
        }

        let tokens: Vec<&str> = line.split(',').collect();
        let m = &self.mapping;
        let Some(date) = tokens.get(m.date) else {
            return Decoded::Skip(SkipReason::MissingDate);
        };
        let Some(symbol) = tokens.get(m.symbol) else {
            return Decoded::Skip(SkipReason::MissingSymbol);
        };

        let price = |index: usize| tokens.get(index).map_or(f64::NAN, |t| parse_price(t));

        Decoded::Record(Record {
            symbol: symbol.to_string(),
            date: date.to_string(),
            open: price(m.open),
            high: price(m.high),
            low: price(m.low),
            close: price(m.close),
            volume: tokens.get(m.volume).and_then(|t| parse_volume(t)),
        })
    }

    pub fn encode(record: &Record) -> FieldValue {
        FieldValue::encode(&record.ohlcv())
    }
}

/// Whether a line names columns rather than holding data: it mentions a
/// column word and carries no numeric token.
pub fn looks_like_header(line: &str) -> bool {
    let lower = line.to_lowercase();
    HEADER_WORDS.iter().any(|w| lower.contains(w))
        && !line.split(',').any(|t| t.trim().parse::<f64>().is_ok())
}

/// Parse a price, yielding NaN for anything unparseable.
pub fn parse_price(token: &str) -> f64 {
    token.trim().parse().unwrap_or(f64::NAN)
}

/// Parse a volume. Decimal volumes are truncated; anything else is the NaN
/// sentinel.
pub fn parse_volume(token: &str) -> Volume {
    let token = token.trim();
    if let Ok(v) = token.parse::<i64>() {
        return Some(v);
    }
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.abs() < i64::MAX as f64)
        .map(|v| v.trunc() as i64)
}
