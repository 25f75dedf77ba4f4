//! Error types for the offer document pipeline.
//!
//! This module defines the error hierarchy used across the crate:
//!
//! - [`CsvError`] - Input table parsing errors
//! - [`SchemaError`] - Invalid offer schema mappings
//! - [`ConfigError`] - Invalid run configuration
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Missing cells and incomplete repeated groups are not errors: they resolve
//! to defaults inside the assembler. Only structural problems surface here.

use thiserror::Error;

// =============================================================================
// Input Parsing Errors
// =============================================================================

/// Errors while reading the source table.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid CSV record.
    #[error("Invalid CSV at line {line}: {message}")]
    ParseError { line: u64, message: String },

    /// Empty file.
    #[error("Input file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in input")]
    NoHeaders,

    /// The same column name appears twice in a header row.
    #[error("Column '{0}' appears more than once in the header row")]
    DuplicateHeader(String),

    /// Spreadsheet workbook could not be read.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// JSON workbook is neither an array of rows nor an object of tables.
    #[error("Invalid JSON workbook: {0}")]
    InvalidWorkbook(String),

    /// JSON syntax error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors in an offer schema mapping, raised when the schema is loaded.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The mapping could not be parsed.
    #[error("Invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A group needs at least two fields.
    #[error("Group '{group}' has {count} field(s), at least 2 are required")]
    GroupTooSmall { group: String, count: usize },

    /// Empty column prefix.
    #[error("Group '{group}' has an empty prefix")]
    EmptyPrefix { group: String },

    /// Two groups share a name.
    #[error("Group '{0}' is defined more than once")]
    DuplicateGroup(String),

    /// A group field key or object field target is repeated.
    #[error("Duplicate key '{key}' in {scope}")]
    DuplicateKey { scope: String, key: String },

    /// A `group` leaf references an unregistered group.
    #[error("Field '{path}' references unknown group '{group}'")]
    UnknownGroup { path: String, group: String },

    /// A prefix would also match another configured column.
    #[error("Prefix '{prefix}' of group '{group}' also matches column '{column}'")]
    PrefixCollision {
        group: String,
        prefix: String,
        column: String,
    },

    /// A list leaf has an empty delimiter.
    #[error("Field '{0}' has an empty list delimiter")]
    EmptyDelimiter(String),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors in run-level configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The issuer identifier is missing.
    #[error("Missing issuer CNPJ (pass --cnpj or set OFERTAS_CNPJ)")]
    MissingCnpj,

    /// The issuer identifier is malformed.
    #[error("Invalid CNPJ '{0}': expected 14 digits")]
    InvalidCnpj(String),

    /// Unknown built-in schema version.
    #[error("Unknown schema version '{0}' (expected v1 or v2)")]
    UnknownSchemaVersion(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error type returned by [`crate::transform::pipeline::aggregate`]
/// and [`crate::transform::pipeline::convert_file`]. Any of these aborts the
/// whole run: no partial container is produced.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input parsing error.
    #[error("Input error: {0}")]
    Csv(#[from] CsvError),

    /// Schema error.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The required table is absent from the workbook.
    #[error("Table '{table}' not found in input")]
    MissingTable { table: String },

    /// The table has no rows.
    #[error("Table '{table}' has no rows to convert")]
    EmptyInput { table: String },

    /// A row is not a column -> value mapping.
    #[error("Row {index} is not an object")]
    InvalidRow { index: usize },

    /// Output write failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Output serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for input parsing.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for schema loading.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
