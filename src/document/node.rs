//! YAML value representation.
//!
//! Captured generator output is decoded by `serde_yaml` and converted into
//! `YamlValue`, a small owned tree with insertion-ordered mappings and string
//! keys. Every check and query in docquery works on this type.
//!
//! # Example
//!
//! ```
//! use docquery::document::node::{YamlNumber, YamlValue};
//! use indexmap::IndexMap;
//!
//! let mut map = IndexMap::new();
//! map.insert("kind".to_string(), YamlValue::String("infrastructure/machine".to_string()));
//! map.insert("count".to_string(), YamlValue::Number(YamlNumber::Integer(4)));
//! let value = YamlValue::Mapping(map);
//!
//! assert_eq!(value.get("kind").and_then(YamlValue::as_str), Some("infrastructure/machine"));
//! assert_eq!(value.get("count").and_then(YamlValue::coerce_integer), Some(4));
//! ```

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde_yaml::Value as SerdeValue;

/// Represents YAML numbers (integer or float)
#[derive(Debug, Clone, PartialEq)]
pub enum YamlNumber {
    Integer(i64),
    Float(f64),
}

impl std::fmt::Display for YamlNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            YamlNumber::Integer(i) => write!(f, "{}", i),
            YamlNumber::Float(fl) => write!(f, "{}", fl),
        }
    }
}

impl YamlNumber {
    pub fn as_f64(&self) -> f64 {
        match self {
            YamlNumber::Integer(i) => *i as f64,
            YamlNumber::Float(f) => *f,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, YamlNumber::Integer(_))
    }
}

/// A decoded YAML value.
///
/// Mappings keep the key order of the source document. Keys are always
/// strings; scalar keys of other types are rendered to their textual form
/// when decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum YamlValue {
    /// A YAML mapping containing key-value pairs
    Mapping(IndexMap<String, YamlValue>),
    /// A YAML sequence
    Sequence(Vec<YamlValue>),
    /// A YAML string
    String(String),
    /// A YAML number (integer or float)
    Number(YamlNumber),
    /// A YAML boolean
    Boolean(bool),
    /// A YAML null value
    Null,
}

impl YamlValue {
    /// Returns the child stored under `key` when this value is a mapping.
    pub fn get(&self, key: &str) -> Option<&YamlValue> {
        match self {
            YamlValue::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            YamlValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            YamlValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[YamlValue]> {
        match self {
            YamlValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, YamlValue>> {
        match self {
            YamlValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Returns true if this value is a mapping.
    ///
    /// # Example
    ///
    /// ```
    /// use docquery::document::node::{YamlNumber, YamlValue};
    /// use indexmap::IndexMap;
    ///
    /// assert!(YamlValue::Mapping(IndexMap::new()).is_mapping());
    /// assert!(!YamlValue::Number(YamlNumber::Integer(42)).is_mapping());
    /// ```
    pub fn is_mapping(&self) -> bool {
        matches!(self, YamlValue::Mapping(_))
    }

    /// Short name of the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            YamlValue::Mapping(_) => "mapping",
            YamlValue::Sequence(_) => "sequence",
            YamlValue::String(_) => "string",
            YamlValue::Number(n) if n.is_integer() => "integer",
            YamlValue::Number(_) => "float",
            YamlValue::Boolean(_) => "boolean",
            YamlValue::Null => "null",
        }
    }

    /// Textual form of a scalar value.
    ///
    /// Strings are returned verbatim; numbers, booleans and null are
    /// rendered the way YAML writes them. Containers have no textual form.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            YamlValue::String(s) => Some(s.clone()),
            YamlValue::Number(n) => Some(n.to_string()),
            YamlValue::Boolean(b) => Some(b.to_string()),
            YamlValue::Null => Some("null".to_string()),
            YamlValue::Mapping(_) | YamlValue::Sequence(_) => None,
        }
    }

    /// Interprets the value as an integer.
    ///
    /// Accepts integers, floats (truncated toward zero) and strings holding
    /// a base-10 integer such as `"3"`. Generators emit `count` fields in
    /// both forms.
    pub fn coerce_integer(&self) -> Option<i64> {
        match self {
            YamlValue::Number(YamlNumber::Integer(i)) => Some(*i),
            YamlValue::Number(YamlNumber::Float(f)) if f.is_finite() => Some(f.trunc() as i64),
            YamlValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Converts a `serde_yaml::Value` into a `YamlValue`.
    ///
    /// `path` locates the value in its document for error reporting.
    pub fn from_serde(value: SerdeValue, path: &str) -> Result<Self> {
        let converted = match value {
            SerdeValue::Mapping(map) => {
                let mut entries = IndexMap::with_capacity(map.len());
                for (key, child) in map {
                    let key = mapping_key(key, path)?;
                    if entries.contains_key(&key) {
                        // `1` and `'1'` both render as "1"
                        return Err(Error::type_mismatch(
                            path,
                            "unique mapping keys",
                            format!("duplicate key `{}`", key),
                        ));
                    }
                    let child_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", path, key)
                    };
                    let child = YamlValue::from_serde(child, &child_path)?;
                    entries.insert(key, child);
                }
                YamlValue::Mapping(entries)
            }
            SerdeValue::Sequence(items) => YamlValue::Sequence(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(idx, item)| YamlValue::from_serde(item, &format!("{}[{}]", path, idx)))
                    .collect::<Result<_>>()?,
            ),
            SerdeValue::String(s) => YamlValue::String(s),
            SerdeValue::Number(n) => YamlValue::Number(number_from_serde(&n)),
            SerdeValue::Bool(b) => YamlValue::Boolean(b),
            SerdeValue::Null => YamlValue::Null,
            // Tags carry no meaning for validation
            SerdeValue::Tagged(tagged) => YamlValue::from_serde(tagged.value, path)?,
        };
        Ok(converted)
    }

    /// Converts this value back into a `serde_yaml::Value` for encoding.
    pub fn to_serde(&self) -> SerdeValue {
        match self {
            YamlValue::Mapping(entries) => {
                let map: serde_yaml::Mapping = entries
                    .iter()
                    .map(|(k, v)| (SerdeValue::String(k.clone()), v.to_serde()))
                    .collect();
                SerdeValue::Mapping(map)
            }
            YamlValue::Sequence(items) => {
                SerdeValue::Sequence(items.iter().map(YamlValue::to_serde).collect())
            }
            YamlValue::String(s) => SerdeValue::String(s.clone()),
            YamlValue::Number(YamlNumber::Integer(i)) => {
                SerdeValue::Number(serde_yaml::Number::from(*i))
            }
            YamlValue::Number(YamlNumber::Float(f)) => {
                SerdeValue::Number(serde_yaml::Number::from(*f))
            }
            YamlValue::Boolean(b) => SerdeValue::Bool(*b),
            YamlValue::Null => SerdeValue::Null,
        }
    }
}

fn number_from_serde(n: &serde_yaml::Number) -> YamlNumber {
    match n.as_i64() {
        Some(i) => YamlNumber::Integer(i),
        None => YamlNumber::Float(n.as_f64().unwrap_or(f64::NAN)),
    }
}

fn mapping_key(key: SerdeValue, path: &str) -> Result<String> {
    match key {
        SerdeValue::String(s) => Ok(s),
        SerdeValue::Number(n) => Ok(number_from_serde(&n).to_string()),
        SerdeValue::Bool(b) => Ok(b.to_string()),
        SerdeValue::Null => Ok("null".to_string()),
        SerdeValue::Tagged(tagged) => mapping_key(tagged.value, path),
        SerdeValue::Mapping(_) => Err(Error::type_mismatch(path, "scalar mapping key", "mapping")),
        SerdeValue::Sequence(_) => {
            Err(Error::type_mismatch(path, "scalar mapping key", "sequence"))
        }
    }
}
