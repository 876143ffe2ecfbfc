//! Error types for the bi-temporal merge engine.
//!
//! This module defines the canonical error type used throughout the crate.
//! All operations return `Result<T, Error>` for error handling.

use rusqlite;
use std::io;
use thiserror::Error;

/// Canonical error type for all bi-temporal store operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
/// Store and I/O errors auto-convert via `#[from]`; every error aborts the
/// enclosing batch and rolls back its transaction.
#[derive(Error, Debug)]
pub enum Error {
    /// A fact is missing `entity_id` or `event_time`.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A timestamp could not be parsed, or was of an unsupported type.
    #[error("bad timestamp: {0}")]
    BadTimestamp(String),

    /// SQLite store error (auto-converts from `rusqlite::Error`)
    #[error("store error: {0}")]
    StoreError(#[from] rusqlite::Error),

    /// `set_watermark` was called with a value that would regress the watermark.
    #[error("watermark regression: attempted {attempted}, current {current}")]
    WatermarkRegression { attempted: String, current: String },

    /// I/O error (auto-converts from `std::io::Error`)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed engine configuration.
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_display() {
        let err = Error::MissingField("entity_id".to_string());
        assert_eq!(format!("{}", err), "missing field: entity_id");
    }

    #[test]
    fn test_bad_timestamp_display() {
        let err = Error::BadTimestamp("not-a-date".to_string());
        assert_eq!(format!("{}", err), "bad timestamp: not-a-date");
    }

    #[test]
    fn test_watermark_regression_display() {
        let err = Error::WatermarkRegression {
            attempted: "2025-01-01T00:00:00Z".to_string(),
            current: "2025-02-01T00:00:00Z".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "watermark regression: attempted 2025-01-01T00:00:00Z, current 2025-02-01T00:00:00Z"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = Error::Config("missing watermark_name".to_string());
        assert_eq!(format!("{}", err), "config error: missing watermark_name");
    }
}
