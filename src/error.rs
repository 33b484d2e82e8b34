use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading a transcript file or its directory.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON parse error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: expected a top-level JSON array of records")]
    NotAnArray { path: PathBuf },

    #[error("{path}: record {index} is not a JSON object")]
    NotAnObject { path: PathBuf, index: usize },

    #[error("{path}: missing required columns {missing:?}")]
    MissingColumns { path: PathBuf, missing: Vec<String> },

    #[error("{path}: cannot derive a university id from the file name")]
    NoUniversity { path: PathBuf },
}

/// Failures while evaluating one query.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("statement is not read-only")]
    NotReadOnly,
}

/// Failures while loading the analysis configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Invalid(String),
}
