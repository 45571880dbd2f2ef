//! Error types for the tyosis importer.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the importer.
///
/// Every variant except `Aborted` is fatal for the whole run. `Aborted` marks a
/// source that stopped early because a sibling source failed.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed option value (e.g. a non-numeric column index).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unparseable date token while date conversion is enabled.
    #[error("Unrecognized date format: {token} (line {line_number} of {source_name}: {line})")]
    DateParse {
        token: String,
        line: String,
        source_name: String,
        line_number: u64,
    },

    /// The first upsert of a source could not be read back.
    #[error("Can't find the value for key: {key}, field: {field} ({reason})")]
    Verification {
        key: String,
        field: String,
        reason: String,
    },

    /// An input path does not exist.
    #[error("Input file '{}' not found", .0.display())]
    InputNotFound(PathBuf),

    /// Store client error.
    #[error("Store error: {0}")]
    Store(String),

    /// The source was stopped because another source hit a fatal error.
    #[error("Import aborted")]
    Aborted,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Error::Store(msg.into())
    }

    /// Create a verification error.
    pub fn verification(key: &str, field: &str, reason: impl Into<String>) -> Self {
        Error::Verification {
            key: key.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Process exit code for this error.
    ///
    /// Date-parse failures and missing inputs exit with 1; everything else with 255.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::DateParse { .. } | Error::InputNotFound(_) => 1,
            _ => 255,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let date_err = Error::DateParse {
            token: "not-a-date".into(),
            line: "AAPL,not-a-date,1,2,3,4,5".into(),
            source_name: "a.csv".into(),
            line_number: 3,
        };
        assert_eq!(date_err.exit_code(), 1);
        assert_eq!(Error::InputNotFound(PathBuf::from("x.csv")).exit_code(), 1);
        assert_eq!(Error::verification("AAPL", "20200102", "empty").exit_code(), 255);
        assert_eq!(Error::config("bad index").exit_code(), 255);
    }

    #[test]
    fn test_date_parse_message_names_token_and_line() {
        let err = Error::DateParse {
            token: "not-a-date".into(),
            line: "AAPL,not-a-date".into(),
            source_name: "a.csv".into(),
            line_number: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("not-a-date"));
        assert!(msg.contains("line 7 of a.csv"));
    }
}
