//! Domain models for the offer document pipeline.
//!
//! - [`Cnpj`] - Issuer identifier, validated once per run
//! - [`IssuerFormat`] - How the issuer appears in the output container
//! - [`RunMetadata`] - Values captured once at run start
//! - [`OutputContainer`] - Top-level document holding all offers

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};

/// Output date format (`DD/MM/YYYY`).
pub const DATE_FORMAT: &str = "%d/%m/%Y";

static CNPJ_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{14}$").unwrap());
static CNPJ_PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.\-/\s]").unwrap());

// =============================================================================
// Issuer Identification
// =============================================================================

/// Brazilian company registry number identifying the offer issuer.
///
/// Accepts formatted input (`11.222.333/0001-81`) and stores the bare 14 digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cnpj(String);

impl Cnpj {
    /// Parse and normalize a CNPJ.
    pub fn parse(raw: &str) -> ConfigResult<Self> {
        let digits = CNPJ_PUNCTUATION.replace_all(raw.trim(), "");
        if digits.is_empty() {
            return Err(ConfigError::MissingCnpj);
        }
        if !CNPJ_DIGITS.is_match(&digits) {
            return Err(ConfigError::InvalidCnpj(raw.to_string()));
        }
        Ok(Self(digits.into_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Cnpj {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Cnpj {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cnpj> for String {
    fn from(cnpj: Cnpj) -> Self {
        cnpj.0
    }
}

impl fmt::Display for Cnpj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Placement of the issuer identifier in the output container.
///
/// `{ "key": "cnpj" }` emits `"cnpj": "..."`; adding `"nested_key": "cnpj"`
/// with key `prestadora` emits `"prestadora": { "cnpj": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerFormat {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_key: Option<String>,
}

impl IssuerFormat {
    pub fn flat(key: &str) -> Self {
        Self { key: key.to_string(), nested_key: None }
    }

    pub fn nested(key: &str, nested_key: &str) -> Self {
        Self {
            key: key.to_string(),
            nested_key: Some(nested_key.to_string()),
        }
    }

    /// The value stored under [`IssuerFormat::key`].
    pub fn render(&self, cnpj: &Cnpj) -> Value {
        match &self.nested_key {
            Some(inner) => {
                let mut object = Map::new();
                object.insert(inner.clone(), Value::String(cnpj.to_string()));
                Value::Object(object)
            }
            None => Value::String(cnpj.to_string()),
        }
    }
}

impl Default for IssuerFormat {
    fn default() -> Self {
        Self::flat("cnpj")
    }
}

// =============================================================================
// Run Metadata
// =============================================================================

/// Values fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMetadata {
    /// Generation date, captured once at run start.
    pub generated_on: NaiveDate,
    /// Issuer of every offer in the file.
    pub issuer: Cnpj,
}

impl RunMetadata {
    /// Metadata stamped with today's local date.
    pub fn now(issuer: Cnpj) -> Self {
        Self {
            generated_on: Local::now().date_naive(),
            issuer,
        }
    }

    pub fn formatted_date(&self) -> String {
        self.generated_on.format(DATE_FORMAT).to_string()
    }
}

// =============================================================================
// Output Container
// =============================================================================

/// The complete disclosure document.
///
/// Offers are only ever appended, in input row order.
#[derive(Debug, Clone)]
pub struct OutputContainer {
    metadata: RunMetadata,
    issuer_format: IssuerFormat,
    offers: Vec<Value>,
}

impl OutputContainer {
    pub fn new(metadata: RunMetadata, issuer_format: IssuerFormat) -> Self {
        Self {
            metadata,
            issuer_format,
            offers: Vec::new(),
        }
    }

    pub fn push(&mut self, offer: Value) {
        self.offers.push(offer);
    }

    pub fn offers(&self) -> &[Value] {
        &self.offers
    }

    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    /// Convert into a JSON value with the container's key order.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl Serialize for OutputContainer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("dataUltimaAtualizacaoArquivo", &self.metadata.formatted_date())?;
        map.serialize_entry(
            &self.issuer_format.key,
            &self.issuer_format.render(&self.metadata.issuer),
        )?;
        map.serialize_entry("ofertas", &self.offers)?;
        map.end()
    }
}
