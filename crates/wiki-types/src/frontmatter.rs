//! Structured per-page data.
//!
//! Frontmatter is parsed once into a closed set of shapes: strings, lists
//! of strings and nested maps. Any other shape is rejected here with
//! [`IndexError::UnsupportedFieldShape`], so indexes never meet it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Reserved top-level key naming the page itself rather than a field.
pub const IDENTIFIER_KEY: &str = "identifier";

/// A frontmatter field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A scalar string
    String(String),
    /// A list of strings, one posting per element
    List(Vec<String>),
    /// A nested table, addressed with dotted paths
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Build a list value.
    pub fn list<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Self {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Return the string if this is a scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn from_json(path: &str, value: serde_json::Value) -> Result<Self, IndexError> {
        use serde_json::Value;

        match value {
            Value::String(s) => Ok(FieldValue::String(s)),
            Value::Array(items) => {
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => list.push(s),
                        other => {
                            return Err(IndexError::unsupported(
                                path,
                                format!("list containing {}", json_kind(&other)),
                            ))
                        }
                    }
                }
                Ok(FieldValue::List(list))
            }
            Value::Object(object) => {
                let mut map = BTreeMap::new();
                for (key, value) in object {
                    let child = join_path(path, &key);
                    map.insert(key, FieldValue::from_json(&child, value)?);
                }
                Ok(FieldValue::Map(map))
            }
            other => Err(IndexError::unsupported(path, json_kind(&other))),
        }
    }

    fn from_toml(path: &str, value: toml::Value) -> Result<Self, IndexError> {
        use toml::Value;

        match value {
            Value::String(s) => Ok(FieldValue::String(s)),
            Value::Array(items) => {
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => list.push(s),
                        other => {
                            return Err(IndexError::unsupported(
                                path,
                                format!("list containing {}", other.type_str()),
                            ))
                        }
                    }
                }
                Ok(FieldValue::List(list))
            }
            Value::Table(table) => {
                let mut map = BTreeMap::new();
                for (key, value) in table {
                    let child = join_path(path, &key);
                    map.insert(key, FieldValue::from_toml(&child, value)?);
                }
                Ok(FieldValue::Map(map))
            }
            other => Err(IndexError::unsupported(path, other.type_str())),
        }
    }
}

/// Parsed frontmatter of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frontmatter {
    /// Value of the reserved `identifier` key, when it is a string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Every other top-level field
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Frontmatter {
    /// Create empty frontmatter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level field.
    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Parse frontmatter from a JSON object.
    ///
    /// The reserved `identifier` key is captured separately and never
    /// validated as a field; a non-string identifier is ignored.
    pub fn from_json(value: serde_json::Value) -> Result<Self, IndexError> {
        let object = match value {
            serde_json::Value::Object(object) => object,
            serde_json::Value::Null => return Ok(Self::new()),
            other => return Err(IndexError::unsupported("", json_kind(&other))),
        };

        let mut frontmatter = Self::new();
        for (key, value) in object {
            if key == IDENTIFIER_KEY {
                if let serde_json::Value::String(id) = value {
                    frontmatter.identifier = Some(id);
                }
                continue;
            }
            let field = FieldValue::from_json(&key, value)?;
            frontmatter.fields.insert(key, field);
        }
        Ok(frontmatter)
    }

    /// Parse frontmatter from a TOML table.
    pub fn from_toml(table: toml::Table) -> Result<Self, IndexError> {
        let mut frontmatter = Self::new();
        for (key, value) in table {
            if key == IDENTIFIER_KEY {
                if let toml::Value::String(id) = value {
                    frontmatter.identifier = Some(id);
                }
                continue;
            }
            let field = FieldValue::from_toml(&key, value)?;
            frontmatter.fields.insert(key, field);
        }
        Ok(frontmatter)
    }

    /// Parse frontmatter from TOML source text.
    pub fn parse_toml(source: &str) -> Result<Self, IndexError> {
        let table: toml::Table = source
            .parse()
            .map_err(|e: toml::de::Error| IndexError::Index(format!("invalid TOML: {}", e)))?;
        Self::from_toml(table)
    }

    /// Look up a top-level field.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// The `title` field, if it is a string.
    pub fn title(&self) -> Option<&str> {
        self.get("title").and_then(FieldValue::as_str)
    }

    /// Check if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Extend a dotted path with one key.
pub fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;

    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}
