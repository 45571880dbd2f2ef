//! Configuration structures for the tyosis importer.
//!
//! A run's column mapping is built once from built-in defaults, the persisted
//! configuration record and the explicit command-line overrides, in that
//! precedence order, and is then frozen.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Store key holding the last-used mapping and key prefix.
pub const CONFIG_KEY: &str = "tyosis-config";

/// Field name of the persisted key prefix.
pub const KEY_PREFIX_FIELD: &str = "key-prefix";

/// Default pattern for rendering normalized dates.
pub const DEFAULT_DATE_FORMAT: &str = "YYYYMMDD";

/// One of the seven mapped columns of an input record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Symbol,
    Date,
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Column {
    /// All columns in their default input order.
    pub const ALL: [Column; 7] = [
        Column::Symbol,
        Column::Date,
        Column::Open,
        Column::High,
        Column::Low,
        Column::Close,
        Column::Volume,
    ];

    /// Name used both as the command-line option and the persisted field.
    pub fn key(self) -> &'static str {
        match self {
            Column::Symbol => "symbol-index",
            Column::Date => "date-index",
            Column::Open => "open-index",
            Column::High => "high-index",
            Column::Low => "low-index",
            Column::Close => "close-index",
            Column::Volume => "volume-index",
        }
    }
}

/// Zero-based token indices of the seven record columns.
///
/// Indices are not required to be distinct. Duplicates are accepted and simply
/// read the same token twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub symbol: usize,
    pub date: usize,
    pub open: usize,
    pub high: usize,
    pub low: usize,
    pub close: usize,
    pub volume: usize,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            symbol: 0,
            date: 1,
            open: 2,
            high: 3,
            low: 4,
            close: 5,
            volume: 6,
        }
    }
}

impl ColumnMapping {
    /// Index of a column.
    pub fn get(&self, column: Column) -> usize {
        match column {
            Column::Symbol => self.symbol,
            Column::Date => self.date,
            Column::Open => self.open,
            Column::High => self.high,
            Column::Low => self.low,
            Column::Close => self.close,
            Column::Volume => self.volume,
        }
    }

    fn slot(&mut self, column: Column) -> &mut usize {
        match column {
            Column::Symbol => &mut self.symbol,
            Column::Date => &mut self.date,
            Column::Open => &mut self.open,
            Column::High => &mut self.high,
            Column::Low => &mut self.low,
            Column::Close => &mut self.close,
            Column::Volume => &mut self.volume,
        }
    }

    /// Resolve the mapping for a run.
    ///
    /// Per column: an explicit override wins, else a persisted value, else the
    /// default.
    pub fn resolve(defaults: &ColumnMapping, persisted: &PartialMapping, overrides: &PartialMapping) -> ColumnMapping {
        let mut mapping = *defaults;
        for column in Column::ALL {
            if let Some(index) = overrides.get(column).or_else(|| persisted.get(column)) {
                *mapping.slot(column) = index;
            }
        }
        mapping
    }

    /// Highest index referenced; a line needs more tokens than this.
    pub fn max_index(&self) -> usize {
        Column::ALL.iter().map(|&c| self.get(c)).max().unwrap_or(0)
    }
}

/// A mapping where each column may be absent.
///
/// Used both for command-line overrides and for the persisted record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialMapping {
    pub symbol: Option<usize>,
    pub date: Option<usize>,
    pub open: Option<usize>,
    pub high: Option<usize>,
    pub low: Option<usize>,
    pub close: Option<usize>,
    pub volume: Option<usize>,
}

impl PartialMapping {
    pub fn get(&self, column: Column) -> Option<usize> {
        match column {
            Column::Symbol => self.symbol,
            Column::Date => self.date,
            Column::Open => self.open,
            Column::High => self.high,
            Column::Low => self.low,
            Column::Close => self.close,
            Column::Volume => self.volume,
        }
    }

    pub fn set(&mut self, column: Column, index: Option<usize>) {
        let slot = match column {
            Column::Symbol => &mut self.symbol,
            Column::Date => &mut self.date,
            Column::Open => &mut self.open,
            Column::High => &mut self.high,
            Column::Low => &mut self.low,
            Column::Close => &mut self.close,
            Column::Volume => &mut self.volume,
        };
        *slot = index;
    }

    /// Parse raw option values into overrides.
    ///
    /// A missing or blank value leaves the column unset. Anything that is not a
    /// non-negative integer is a configuration error.
    pub fn parse_overrides<'a, I>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Column, Option<&'a str>)>,
    {
        let mut overrides = Self::default();
        for (column, raw) in values {
            let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
                continue;
            };
            let index = raw.parse::<usize>().map_err(|_| {
                Error::config(format!(
                    "--{} expects a non-negative integer, got '{}'",
                    column.key(),
                    raw
                ))
            })?;
            overrides.set(column, Some(index));
        }
        Ok(overrides)
    }

    /// Whether no column is set.
    pub fn is_empty(&self) -> bool {
        Column::ALL.iter().all(|&c| self.get(c).is_none())
    }
}

/// Settings remembered from the previous run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedConfig {
    /// Last-used key prefix, if a non-empty one was stored.
    pub key_prefix: Option<String>,
    /// Last-used column indices.
    pub mapping: PartialMapping,
}

/// Typed command-line options of one run, before the config merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Explicit key prefix, if one was given.
    pub key_prefix: Option<String>,
    /// Output date pattern (e.g. `YYYYMMDD`).
    pub date_format: String,
    /// Normalize date tokens before using them as field keys.
    pub convert_date: bool,
    /// Only accept ISO-like dates; no 8-digit pass-through or `DD/MM/YYYY`.
    pub strict_date_validation: bool,
    /// Skip a header row at the top of each source.
    pub skip_header: bool,
    /// Store database number.
    pub database: i64,
    /// Explicit column overrides.
    pub overrides: PartialMapping,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            key_prefix: None,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            convert_date: true,
            strict_date_validation: true,
            skip_header: true,
            database: 0,
            overrides: PartialMapping::default(),
        }
    }
}

/// Frozen configuration of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Prefix prepended to every symbol key (may be empty).
    pub key_prefix: String,
    /// Output pattern for normalized dates.
    pub date_format: String,
    /// Normalize date tokens before using them as field keys.
    pub convert_date: bool,
    /// Only accept ISO-like date tokens.
    pub strict_date_validation: bool,
    /// Skip a column-name row at the top of each source.
    pub skip_header: bool,
    /// Store database number.
    pub database: i64,
    /// Resolved column indices.
    pub mapping: ColumnMapping,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::merge(&RunOptions::default(), &PersistedConfig::default())
    }
}

impl RunConfig {
    /// Merge the run's options with the persisted settings.
    ///
    /// A non-empty explicit prefix wins, else the persisted prefix, else empty.
    pub fn merge(options: &RunOptions, persisted: &PersistedConfig) -> Self {
        let key_prefix = options
            .key_prefix
            .as_ref()
            .filter(|p| !p.is_empty())
            .or(persisted.key_prefix.as_ref())
            .cloned()
            .unwrap_or_default();

        Self {
            key_prefix,
            date_format: options.date_format.clone(),
            convert_date: options.convert_date,
            strict_date_validation: options.strict_date_validation,
            skip_header: options.skip_header,
            database: options.database,
            mapping: ColumnMapping::resolve(&ColumnMapping::default(), &persisted.mapping, &options.overrides),
        }
    }

    /// Flat field/value pairs written to the persisted config record.
    pub fn persisted_fields(&self) -> Vec<(String, String)> {
        let mut fields = Vec::with_capacity(Column::ALL.len() + 1);
        fields.push((KEY_PREFIX_FIELD.to_string(), self.key_prefix.clone()));
        for column in Column::ALL {
            fields.push((column.key().to_string(), self.mapping.get(column).to_string()));
        }
        fields
    }
}
