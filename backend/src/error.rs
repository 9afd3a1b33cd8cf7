//! Error types for the Gridform data engine.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`CsvError`] - CSV encoding and byte decoding errors
//! - [`ImportError`] - malformed or empty input during import
//! - [`ValidationError`] - dataset shape rejected before rendering
//! - [`EditError`] - edit transaction misuse
//! - [`StoreError`] - persistence gateway failures
//! - [`EngineError`] - top-level engine errors
//! - [`ServerError`] - HTTP boundary errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors from the CSV codec.
///
/// Decoding text never fails; these cover byte decoding and writing.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to decode raw bytes into text.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// Failed to write CSV output.
    #[error("Failed to write CSV: {0}")]
    WriteError(String),
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        CsvError::WriteError(err.to_string())
    }
}

// =============================================================================
// Import Errors
// =============================================================================

/// Errors while turning external text (JSON/CSV) into a dataset.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Input has a shape the engine cannot use.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Parsing succeeded but produced no records.
    #[error("No records parsed")]
    EmptyResult,

    /// Input is not valid JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Dataset validation failures. These block the offending load only.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Two fields share the same key.
    #[error("Duplicate field key: {0}")]
    DuplicateKey(String),

    /// The dataset has no fields.
    #[error("Dataset has no fields")]
    EmptyDataset,
}

// =============================================================================
// Edit Errors
// =============================================================================

/// Errors raised by the edit transaction manager.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    /// Record index outside the dataset. Signals a caller bug.
    #[error("Record index {index} out of range (dataset has {len} records)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Commit or cancel without an edit in flight.
    #[error("No edit in progress")]
    NotEditing,
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors from the persistence gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored snapshot could not be interpreted.
    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),
}

// =============================================================================
// Engine Errors (top-level)
// =============================================================================

/// Top-level engine errors.
///
/// Returned by [`crate::engine::GridEngine`] operations. Wraps all
/// lower-level errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// CSV codec error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Import error.
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Edit error.
    #[error("Edit error: {0}")]
    Edit(#[from] EditError),

    /// Persistence error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Export requested with no records loaded.
    #[error("No data to export")]
    NothingToExport,

    /// Dataset could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Engine error.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

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

/// Result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Result type for validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for edit operations.
pub type EditResult<T> = Result<T, EditError>;

/// Result type for persistence operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
