//! Error handling for the pipeline.
//!
//! The four domain variants follow the failure taxonomy of the pipeline:
//! ingestion failures are transient and retryable by the caller, schema
//! failures abort one load, validation failures reject the offending row or
//! request, and unknown categories reject a single prediction.

use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

pub mod util;

/// Specialized error type for the pipeline
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Source unreachable, non-success status, or a page that cannot be read
    #[error("Ingestion error for {url}: {message}")]
    Ingestion { url: String, message: String },

    /// Required structure absent from a table or artifact
    #[error("Schema error in {source_name}: {message}")]
    Schema { source_name: String, message: String },

    /// A row or request whose values contradict the data contract
    #[error("Validation error: {0}")]
    Validation(String),

    /// A categorical value the fitted encoder has never seen
    #[error("Unknown {field} category '{value}'")]
    UnknownCategory { field: String, value: String },

    /// Column lookup by name failed
    #[error("Column not found: {column}")]
    ColumnNotFound { column: String },

    /// Column exists but cannot be read as the expected type
    #[error("Invalid data type for column {column}: expected {expected}")]
    InvalidDataType { column: String, expected: String },

    /// Error opening or reading a file
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Error decoding tabular data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error reading or writing CSV records
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error decoding a JSON artifact or config file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Build an ingestion error for a URL
    pub fn ingestion(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Ingestion {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Build a schema error for a named source (file, table, artifact)
    pub fn schema(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Build a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Build an IO error carrying the path it happened at
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the caller may retry the operation that produced this error
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Ingestion { .. })
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
