//! Offer schema definition
//!
//! The schema declares, path by path, how one flat offer row becomes one
//! nested offer document. It also carries the registry of repeated groups.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::normalize::DEFAULT_LIST_DELIMITER;
use crate::error::SchemaResult;
use crate::models::IssuerFormat;
use crate::validation::validate_schema;

/// A complete offer schema mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferSchema {
    /// Version of the target layout
    #[serde(default = "default_version")]
    pub version: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Where the issuer identifier goes in the container
    #[serde(default)]
    pub issuer: IssuerFormat,

    /// Repeated group registry
    #[serde(default)]
    pub groups: Vec<GroupDefinition>,

    /// Ordered top-level fields of each offer document
    pub fields: Vec<SchemaField>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// A repeated attribute group spread over numbered columns
/// (`formaPagamento1`, `descontoPagamento1`, `formaPagamento2`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDefinition {
    /// Name referenced by `group` fields
    pub name: String,
    /// Members of one instance, in output key order
    pub fields: Vec<GroupField>,
}

/// One member of a repeated group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupField {
    /// Literal column name prefix, matched case-sensitively
    pub prefix: String,
    /// Output key (defaults to the prefix)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// A named entry in an output object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Output key
    pub target: String,
    #[serde(flatten)]
    pub rule: FieldRule,
}

/// How an output value is produced from the row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldRule {
    /// Direct cell lookup
    Scalar {
        source: String,
        /// Used when the cell is missing, null or empty
        #[serde(default = "default_scalar")]
        default: Value,
        /// Render numbers and booleans as strings
        #[serde(default)]
        text: bool,
    },

    /// Delimiter-encoded cell split into a list of strings
    List {
        source: String,
        #[serde(default = "default_list_delimiter")]
        delimiter: String,
    },

    /// Fixed-shape nested object built from the same row
    Object { fields: Vec<SchemaField> },

    /// Instances of a registered repeated group
    Group { group: String },

    /// Literal value
    Constant { value: Value },
}

fn default_scalar() -> Value {
    Value::String(String::new())
}

fn default_list_delimiter() -> String {
    DEFAULT_LIST_DELIMITER.to_string()
}

impl OfferSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self {
            version: default_version(),
            description: String::new(),
            issuer: IssuerFormat::default(),
            groups: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Parse and validate a schema from a JSON string
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        let schema: Self = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Parse and validate a schema from a JSON value
    pub fn from_value(value: &Value) -> SchemaResult<Self> {
        let schema = Self::deserialize(value)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Serialize to a pretty JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check group registry and field tree consistency
    pub fn validate(&self) -> SchemaResult<()> {
        validate_schema(self)
    }

    /// Register a repeated group
    pub fn with_group(mut self, group: GroupDefinition) -> Self {
        self.groups.push(group);
        self
    }

    /// Append a top-level field
    pub fn with_field(mut self, field: SchemaField) -> Self {
        self.fields.push(field);
        self
    }

    /// Look up a group by name
    pub fn group(&self, name: &str) -> Option<&GroupDefinition> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// All columns read by `scalar` and `list` fields, in declaration order
    pub fn source_columns(&self) -> Vec<String> {
        let mut columns = Vec::new();
        collect_sources(&self.fields, &mut columns);
        columns
    }

    /// All group prefixes with their group name
    pub fn group_prefixes(&self) -> Vec<(&str, &str)> {
        self.groups
            .iter()
            .flat_map(|g| g.fields.iter().map(move |f| (g.name.as_str(), f.prefix.as_str())))
            .collect()
    }
}

fn collect_sources(fields: &[SchemaField], out: &mut Vec<String>) {
    for field in fields {
        match &field.rule {
            FieldRule::Scalar { source, .. } | FieldRule::List { source, .. } => {
                if !out.contains(source) {
                    out.push(source.clone());
                }
            }
            FieldRule::Object { fields } => collect_sources(fields, out),
            FieldRule::Group { .. } | FieldRule::Constant { .. } => {}
        }
    }
}

impl Default for OfferSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupDefinition {
    /// Group whose output keys equal the column prefixes
    pub fn new(name: &str, prefixes: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            fields: prefixes.iter().map(|p| GroupField::new(p)).collect(),
        }
    }

    /// Group built from explicit fields
    pub fn with_fields(name: &str, fields: Vec<GroupField>) -> Self {
        Self {
            name: name.to_string(),
            fields,
        }
    }
}

impl GroupField {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            key: None,
        }
    }

    /// Read columns under `prefix` but emit them as `key`
    pub fn renamed(prefix: &str, key: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            key: Some(key.to_string()),
        }
    }

    /// Output key of this member
    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.prefix)
    }
}

impl SchemaField {
    /// Scalar read from a column of the same name
    pub fn scalar(target: &str) -> Self {
        Self::scalar_from(target, target)
    }

    /// Scalar read from a named column
    pub fn scalar_from(target: &str, source: &str) -> Self {
        Self {
            target: target.to_string(),
            rule: FieldRule::Scalar {
                source: source.to_string(),
                default: default_scalar(),
                text: false,
            },
        }
    }

    /// List split from a named column
    pub fn list_from(target: &str, source: &str) -> Self {
        Self {
            target: target.to_string(),
            rule: FieldRule::List {
                source: source.to_string(),
                delimiter: default_list_delimiter(),
            },
        }
    }

    /// Nested object
    pub fn object(target: &str, fields: Vec<SchemaField>) -> Self {
        Self {
            target: target.to_string(),
            rule: FieldRule::Object { fields },
        }
    }

    /// Instances of a registered group
    pub fn group(target: &str, group: &str) -> Self {
        Self {
            target: target.to_string(),
            rule: FieldRule::Group {
                group: group.to_string(),
            },
        }
    }

    /// Literal value
    pub fn constant(target: &str, value: Value) -> Self {
        Self {
            target: target.to_string(),
            rule: FieldRule::Constant { value },
        }
    }

    /// Coerce a scalar to text (no effect on other rules)
    pub fn text(mut self) -> Self {
        if let FieldRule::Scalar { text, .. } = &mut self.rule {
            *text = true;
        }
        self
    }

    /// Set a scalar default (no effect on other rules)
    pub fn with_default(mut self, value: Value) -> Self {
        if let FieldRule::Scalar { default, .. } = &mut self.rule {
            *default = value;
        }
        self
    }

    /// Set a list delimiter (no effect on other rules)
    pub fn with_delimiter(mut self, value: &str) -> Self {
        if let FieldRule::List { delimiter, .. } = &mut self.rule {
            *delimiter = value.to_string();
        }
        self
    }
}
