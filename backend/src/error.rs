//! Error types for the Staffload import pipeline.
//!
//! This module defines one error type per layer:
//!
//! - [`CsvError`] - Tabular file decoding and parsing errors
//! - [`RepositoryError`] - Persistence gateway errors
//! - [`PipelineError`] - Top-level import orchestration errors
//! - [`ServerError`] - HTTP surface errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Cell-level validation findings are *not* errors in this sense: they are
//! collected as [`crate::validation::ValidationError`] records and reported
//! in full. Per-record persistence failures likewise end up as data in
//! [`crate::batch::BatchOutcome`].

use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors during tabular file parsing.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode the byte stream.
    #[error("Failed to decode content: {0}")]
    Encoding(String),

    /// Invalid CSV structure.
    #[error("Invalid CSV at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

impl CsvError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(0);
        CsvError::Parse {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Repository Errors
// =============================================================================

/// Errors raised by a [`crate::store::WorkerRepository`].
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Entity does not exist (or belongs to another tenant).
    #[error("Worker not found: {0}")]
    NotFound(Uuid),

    /// Uniqueness constraint violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backend failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error.
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level import orchestration errors.
///
/// This is the error type returned by [`crate::transform::pipeline::import_bytes`].
/// Row-level problems never show up here; they live in the validation result.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Repository error raised outside per-record execution (candidate lookup).
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Partial imports are disabled and some rows failed validation.
    #[error("{error_rows} row(s) failed validation, nothing was imported")]
    ValidationFailed { error_rows: usize },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
