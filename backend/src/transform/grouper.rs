//! Extract repeated attribute groups from one flat offer row.
//!
//! A spreadsheet cannot hold a list inside a cell, so repeated records are
//! spread over numbered columns sharing a prefix:
//!
//! ```text
//! Row columns                                    →  Group instances
//! ┌──────────────────────────────────────────┐      ┌──────────────────────────────┐
//! │ formaPagamento1: boleto                  │      │ formaPagamento: boleto       │
//! │ descontoPagamento1: 10%                  │  →   │ descontoPagamento: 10%       │
//! │ formaPagamento2: (empty)                 │      └──────────────────────────────┘
//! │ descontoPagamento2: 5%     ← dropped     │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Alignment
//!
//! The k-th column found for each prefix form the k-th instance. Columns are
//! taken in the row's own column order, not by numeric suffix. When prefixes
//! match different numbers of columns, only the shortest count is used.
//! An instance is emitted only when every member is truthy; partial instances
//! are dropped rather than padded with nulls.

use serde_json::{Map, Value};

use super::dsl::normalize::is_truthy;
use super::dsl::{GroupDefinition, GroupField, OfferSchema};

/// One flat input row: column name → raw cell value, in column order.
pub type Row = Map<String, Value>;

/// One fully populated repeated record.
pub type GroupInstance = Map<String, Value>;

/// Columns of `row` whose name starts with `prefix`, in row order.
///
/// Matching is exact and case-sensitive.
pub fn discover_columns<'r>(row: &'r Row, prefix: &str) -> Vec<&'r str> {
    row.keys()
        .filter(|column| column.starts_with(prefix))
        .map(String::as_str)
        .collect()
}

/// Extract the complete instances of a group from a row.
///
/// Never fails: missing columns or sparse cells just yield fewer instances.
pub fn extract(row: &Row, fields: &[GroupField]) -> Vec<GroupInstance> {
    let columns: Vec<Vec<&str>> = fields
        .iter()
        .map(|field| discover_columns(row, &field.prefix))
        .collect();

    let aligned = columns.iter().map(Vec::len).min().unwrap_or(0);

    (0..aligned)
        .filter_map(|i| {
            let mut instance = Map::new();
            for (field, matches) in fields.iter().zip(&columns) {
                let value = row.get(matches[i])?;
                if !is_truthy(value) {
                    return None;
                }
                instance.insert(field.key().to_string(), value.clone());
            }
            Some(instance)
        })
        .collect()
}

/// Extract a group whose output keys are the prefixes themselves.
pub fn extract_prefixes(row: &Row, prefixes: &[&str]) -> Vec<GroupInstance> {
    let fields: Vec<GroupField> = prefixes.iter().map(|p| GroupField::new(p)).collect();
    extract(row, &fields)
}

/// Extract a registered group definition.
pub fn extract_group(row: &Row, group: &GroupDefinition) -> Vec<GroupInstance> {
    extract(row, &group.fields)
}

/// Extract every group registered in a schema, in registry order.
pub fn extract_all<'s>(row: &Row, schema: &'s OfferSchema) -> Vec<(&'s str, Vec<GroupInstance>)> {
    schema
        .groups
        .iter()
        .map(|group| (group.name.as_str(), extract_group(row, group)))
        .collect()
}
