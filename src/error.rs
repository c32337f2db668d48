//! Error types for graph construction and export

use thiserror::Error;

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;

/// Graph construction errors
///
/// Data-quality problems (missing fields, unresolvable relations, duplicates)
/// are never errors; they degrade the output or show up in the integrity
/// report. Only structural failures end up here.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid resolution policy: {0}")]
    InvalidPolicy(String),

    #[error("Malformed export row in {file} line {line}: {message}")]
    MalformedRow {
        file: String,
        line: usize,
        message: String,
    },

    #[error("Sink rejected batch: {0}")]
    Sink(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
