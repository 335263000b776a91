//! Error types for the restructuring pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`ReadError`] - tabular file parsing errors
//! - [`WriteError`] - output serialization errors
//! - [`StorageError`] - generated-file store errors
//! - [`ConfigError`] - startup configuration errors
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Cell- and row-level issues are not errors at all: they degrade to null or
//! a textual fallback and are recorded in the change log.

use thiserror::Error;

// =============================================================================
// Reader Errors
// =============================================================================

/// Errors while parsing an input file into a table.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The filename extension is neither CSV nor a recognized spreadsheet.
    #[error("Unsupported file format: '{0}' (expected .csv, .tsv, .xls or .xlsx)")]
    UnsupportedFormat(String),

    /// Malformed content.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to decode the byte content.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// The file has no content at all.
    #[error("File is empty")]
    EmptyFile,

    /// The file has no header row.
    #[error("No headers found")]
    NoHeaders,

    /// Failed to read the input.
    #[error("Failed to read input: {0}")]
    IoError(#[from] std::io::Error),
}

// =============================================================================
// Writer Errors
// =============================================================================

/// Errors while serializing the output table.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Structural serialization failure (fatal for the request).
    /// Individual unencodable cells degrade to text instead.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors from the generated-file store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No file with this identifier (or it has expired).
    #[error("File not found: {0}")]
    NotFound(String),

    /// IO error.
    #[error("Storage IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Startup configuration errors. These are fatal and reported before the
/// service accepts any request.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an unparseable value.
    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },

    /// The transformation catalog file could not be read.
    #[error("Cannot read transformation catalog '{path}': {message}")]
    CatalogUnreadable { path: String, message: String },

    /// The transformation catalog file is not valid JSON.
    #[error("Invalid transformation catalog: {0}")]
    CatalogInvalid(#[from] serde_json::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::pipeline::restructure`].
/// It wraps all lower-level errors and adds pipeline-specific variants.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reader error.
    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    /// Writer error.
    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The source file contains no data rows.
    #[error("Source file contains no data rows")]
    EmptyInput,

    /// The request exceeded its processing deadline.
    #[error("Mapping operation timed out")]
    Timeout,
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

/// Result type for reader operations.
pub type ReadResult<T> = Result<T, ReadError>;

/// Result type for writer operations.
pub type WriteResult<T> = Result<T, WriteError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
