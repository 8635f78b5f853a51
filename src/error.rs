//! Error types for the ingestion pipeline.
//!
//! Only uploads with no safe default produce errors. Unparsable numbers and
//! failed enrichment lookups fall back silently and never surface here.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading a management upload (price data, well logs).
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid CSV file: no data rows")]
    Empty,

    #[error("Missing headers: {}", .0.join(", "))]
    MissingHeaders(Vec<String>),
}

/// Failures while interpreting a forecast upload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ForecastError {
    #[error("Forecast file has no header row")]
    NoHeader,

    #[error("Unrecognized forecast layout: no month columns and no {missing} column")]
    UnrecognizedLayout { missing: &'static str },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
