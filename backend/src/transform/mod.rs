//! Transformation module.
//!
//! This module turns flat offer rows into offer documents:
//! - DSL: Offer schema, built-in layouts and the assembler
//! - Grouper: Numbered columns to repeated group instances
//! - Pipeline: Complete conversion run

pub mod dsl;
pub mod grouper;
pub mod pipeline;

pub use dsl::*;
pub use grouper::{
    discover_columns, extract, extract_all, extract_group, extract_prefixes, GroupInstance, Row,
};
pub use pipeline::*;
