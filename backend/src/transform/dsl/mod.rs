//! Declarative offer schema
//!
//! This module provides:
//! - `schema`: the mapping tree and repeated group registry
//! - `normalize`: truthiness, list splitting and text coercion rules
//! - `assembler`: apply a schema to one row
//! - `builtin`: the shipped offer layouts
//!
//! ## Usage Flow
//!
//! ```text
//! row → assembler::assemble(row, schema) → offer document
//!          ├─ scalar / list / constant leaves read the row directly
//!          └─ group leaves call grouper::extract_group
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use ofertas::{assemble, SchemaVersion};
//! use serde_json::json;
//!
//! let schema = SchemaVersion::V1.schema();
//! let row = json!({ "SEAC_listaCanais": "Canal A, Canal B" });
//! let doc = assemble(row.as_object().unwrap(), &schema);
//! assert_eq!(doc["SEAC"]["listaCanais"], json!(["Canal A", "Canal B"]));
//! ```

pub mod assembler;
pub mod builtin;
pub mod normalize;
pub mod schema;

pub use assembler::{assemble, assemble_counting, GroupTotals};
pub use builtin::{example_row, schema_v1, schema_v2, SchemaVersion};
pub use normalize::{is_truthy, split_list, to_text};
pub use schema::{FieldRule, GroupDefinition, GroupField, OfferSchema, SchemaField};
