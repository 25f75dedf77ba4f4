//! Offer schema validation.
//!
//! Group columns are discovered by literal prefix, so a prefix that is also the
//! start of an unrelated column silently pulls that column into the group. The
//! checks here reject such schemas when they are loaded, before any row is read.
//!
//! # Checks
//!
//! - every group has at least two members, with non-empty distinct prefixes and distinct keys
//! - group names are unique and every `group` field names a registered group
//! - object targets are unique within their object
//! - list delimiters are non-empty
//! - no group prefix is a leading substring of another group prefix or of any
//!   column read by a `scalar` or `list` field
//!
//! [`validate_headers`] applies the same rule to the header row of an input
//! table once it is read: a prefix may only match numbered columns.
//!
//! # Example
//!
//! ```rust,ignore
//! use ofertas::{GroupDefinition, OfferSchema, SchemaField};
//!
//! let schema = OfferSchema::new()
//!     .with_group(GroupDefinition::new("pontos", &["tipo", "numeroPontos"]))
//!     .with_field(SchemaField::scalar("tipoOferta"))
//!     .with_field(SchemaField::group("pontos", "pontos"));
//!
//! // "tipo" would also match "tipoOferta"
//! assert!(schema.validate().is_err());
//! ```

use std::collections::HashSet;

use crate::error::{SchemaError, SchemaResult};
use crate::transform::dsl::{FieldRule, OfferSchema, SchemaField};

/// Validate an offer schema.
pub fn validate_schema(schema: &OfferSchema) -> SchemaResult<()> {
    validate_groups(schema)?;
    validate_fields(schema, &schema.fields, "")?;
    validate_prefixes(schema)
}

/// Whether a schema passes [`validate_schema`].
pub fn is_valid_schema(schema: &OfferSchema) -> bool {
    validate_schema(schema).is_ok()
}

/// Check the header row of an input table against the group registry.
///
/// Every header a group prefix matches must be that prefix followed by a
/// numeric suffix. Anything else (`tempoDesconto` next to `tempoDesconto1`)
/// would be pulled into the group.
pub fn validate_headers(schema: &OfferSchema, headers: &[String]) -> SchemaResult<()> {
    for (group, prefix) in schema.group_prefixes() {
        let clash = headers.iter().find(|header| match header.strip_prefix(prefix) {
            Some(suffix) => suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()),
            None => false,
        });

        if let Some(column) = clash {
            return Err(SchemaError::PrefixCollision {
                group: group.to_string(),
                prefix: prefix.to_string(),
                column: column.clone(),
            });
        }
    }

    Ok(())
}

fn validate_groups(schema: &OfferSchema) -> SchemaResult<()> {
    let mut names = HashSet::new();

    for group in &schema.groups {
        if !names.insert(group.name.as_str()) {
            return Err(SchemaError::DuplicateGroup(group.name.clone()));
        }
        if group.fields.len() < 2 {
            return Err(SchemaError::GroupTooSmall {
                group: group.name.clone(),
                count: group.fields.len(),
            });
        }

        let mut prefixes = HashSet::new();
        let mut keys = HashSet::new();
        for field in &group.fields {
            if field.prefix.is_empty() {
                return Err(SchemaError::EmptyPrefix {
                    group: group.name.clone(),
                });
            }
            if !prefixes.insert(field.prefix.as_str()) {
                return Err(SchemaError::DuplicateKey {
                    scope: format!("prefixes of group '{}'", group.name),
                    key: field.prefix.clone(),
                });
            }
            if !keys.insert(field.key()) {
                return Err(SchemaError::DuplicateKey {
                    scope: format!("keys of group '{}'", group.name),
                    key: field.key().to_string(),
                });
            }
        }
    }

    Ok(())
}

fn validate_fields(schema: &OfferSchema, fields: &[SchemaField], parent: &str) -> SchemaResult<()> {
    let mut targets = HashSet::new();

    for field in fields {
        let path = if parent.is_empty() {
            field.target.clone()
        } else {
            format!("{}.{}", parent, field.target)
        };

        if !targets.insert(field.target.as_str()) {
            return Err(SchemaError::DuplicateKey {
                scope: if parent.is_empty() {
                    "offer document".to_string()
                } else {
                    format!("object '{}'", parent)
                },
                key: field.target.clone(),
            });
        }

        match &field.rule {
            FieldRule::Group { group } if schema.group(group).is_none() => {
                return Err(SchemaError::UnknownGroup {
                    path,
                    group: group.clone(),
                });
            }
            FieldRule::List { delimiter, .. } if delimiter.is_empty() => {
                return Err(SchemaError::EmptyDelimiter(path));
            }
            FieldRule::Object { fields } => validate_fields(schema, fields, &path)?,
            _ => {}
        }
    }

    Ok(())
}

fn validate_prefixes(schema: &OfferSchema) -> SchemaResult<()> {
    let prefixes = schema.group_prefixes();
    let sources = schema.source_columns();

    for (i, (group, prefix)) in prefixes.iter().enumerate() {
        let other_prefixes = prefixes
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, (_, other))| *other);

        let clash = other_prefixes
            .chain(sources.iter().map(String::as_str))
            .find(|column| column.starts_with(prefix));

        if let Some(column) = clash {
            return Err(SchemaError::PrefixCollision {
                group: group.to_string(),
                prefix: prefix.to_string(),
                column: column.to_string(),
            });
        }
    }

    Ok(())
}
