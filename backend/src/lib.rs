//! # Ofertas - Offer disclosure documents from spreadsheet rows
//!
//! Ofertas turns the flat offers spreadsheet (one row per commercial offer,
//! repeated attributes spread over numbered columns) into the nested JSON
//! disclosure file published by telecom operators.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ XLSX / CSV  │────▶│   Parser    │────▶│  Assembler  │────▶│  Container  │
//! │  workbook   │     │  (tables)   │     │ (schema+grp)│     │   (JSON)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ofertas::{convert_file, write_container, RunConfig};
//!
//! let config = RunConfig::new("ofertas.csv").with_cnpj("11222333000181");
//! let result = convert_file(&config).unwrap();
//! write_container(&result.container, None).unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`logs`] - Progress log broadcaster
//! - [`models`] - Issuer, run metadata and output container
//! - [`parser`] - Spreadsheet, CSV and JSON workbook input
//! - [`transform`] - Schema, group extraction, assembly and pipeline
//! - [`validation`] - Offer schema validation

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, ConfigResult, CsvError, CsvResult, PipelineError, PipelineResult, SchemaError,
    SchemaResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Cnpj, IssuerFormat, OutputContainer, RunMetadata, DATE_FORMAT};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{is_valid_schema, validate_headers, validate_schema};

// =============================================================================
// Re-exports - Grouper
// =============================================================================

pub use transform::grouper::{
    discover_columns, extract, extract_all, extract_group, extract_prefixes, GroupInstance, Row,
};

// =============================================================================
// Re-exports - Input Parsing
// =============================================================================

pub use parser::{
    csv_to_json, decode_content, detect_delimiter, detect_encoding, format_delimiter,
    parse_bytes_auto, parse_csv, parse_csv_file_auto, parse_json_workbook, parse_spreadsheet,
    read_workbook, ParseResult, Table, Workbook, DEFAULT_TABLE, SPREADSHEET_EXTENSIONS,
};

// =============================================================================
// Re-exports - DSL
// =============================================================================

pub use transform::dsl::{
    assemble, assemble_counting, example_row, is_truthy, schema_v1, schema_v2, split_list,
    to_text, FieldRule, GroupDefinition, GroupField, GroupTotals, OfferSchema, SchemaField,
    SchemaVersion,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    aggregate, convert_file, group_report, load_schema, render_container, unmapped_columns,
    write_container, ConversionResult, InputInfo, RunConfig, SchemaSource,
};

// =============================================================================
// Re-exports - Logs
// =============================================================================

pub use logs::{LogBroadcaster, LogEntry, LogLevel, LogSummary, LOG_BROADCASTER};
