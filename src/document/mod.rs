//! Document model for generated configuration streams.
//!
//! A generator emits a stream of YAML mappings, each tagged with a `kind`
//! such as `epiphany-cluster` or `infrastructure/machine`. This module holds
//! the `Document` type wrapping one such mapping and the loader functions
//! that decode captured text into documents.

pub mod node;
pub mod parser;

use crate::error::{Error, Result};
use crate::query::FieldPath;
use indexmap::IndexMap;
use node::YamlValue;

/// One top-level mapping from a YAML stream.
///
/// `index` is the position of the document in its collection and is used
/// only to locate errors.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    index: usize,
    fields: IndexMap<String, YamlValue>,
}

impl Document {
    pub fn new(index: usize, fields: IndexMap<String, YamlValue>) -> Self {
        Self { index, fields }
    }

    /// Builds a document from a decoded value, which must be a mapping.
    pub fn from_value(index: usize, value: YamlValue) -> Result<Self> {
        match value {
            YamlValue::Mapping(fields) => Ok(Self::new(index, fields)),
            other => Err(Error::type_mismatch(
                format!("document #{}", index),
                "mapping",
                other.type_name(),
            )),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn fields(&self) -> &IndexMap<String, YamlValue> {
        &self.fields
    }

    pub fn into_fields(self) -> IndexMap<String, YamlValue> {
        self.fields
    }

    /// The document's `kind` tag, if it is a string.
    pub fn kind(&self) -> Option<&str> {
        self.fields.get("kind").and_then(YamlValue::as_str)
    }

    /// The document's `provider`, if it is a string.
    pub fn provider(&self) -> Option<&str> {
        self.fields.get("provider").and_then(YamlValue::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&YamlValue> {
        self.fields.get(key)
    }

    /// Follows `path` through nested mappings.
    pub fn lookup(&self, path: &FieldPath) -> Option<&YamlValue> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.fields.get(first)?;
        for key in rest {
            current = current.get(key)?;
        }
        Some(current)
    }

    /// Like `lookup`, but a missing field is an error naming this document.
    pub fn require(&self, path: &[&str]) -> Result<&YamlValue> {
        let path = FieldPath::from_keys(path);
        self.lookup(&path)
            .ok_or_else(|| Error::missing_field(self.label(), path.to_string()))
    }

    /// Human readable location, e.g. "`epiphany-cluster` document #3".
    pub fn label(&self) -> String {
        match self.kind() {
            Some(kind) => format!("`{}` document #{}", kind, self.index),
            None => format!("document #{}", self.index),
        }
    }

    pub fn to_value(&self) -> YamlValue {
        YamlValue::Mapping(self.fields.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::node::YamlNumber;

    fn cluster() -> Document {
        let mut cloud = IndexMap::new();
        cloud.insert(
            "k8s_as_cloud_service".to_string(),
            YamlValue::Boolean(true),
        );
        let mut spec = IndexMap::new();
        spec.insert("cloud".to_string(), YamlValue::Mapping(cloud));

        let mut fields = IndexMap::new();
        fields.insert(
            "kind".to_string(),
            YamlValue::String("epiphany-cluster".to_string()),
        );
        fields.insert("provider".to_string(), YamlValue::String("any".to_string()));
        fields.insert("specification".to_string(), YamlValue::Mapping(spec));
        Document::new(3, fields)
    }

    #[test]
    fn test_kind_and_provider() {
        let doc = cluster();
        assert_eq!(doc.kind(), Some("epiphany-cluster"));
        assert_eq!(doc.provider(), Some("any"));
    }

    #[test]
    fn test_require_nested_field() {
        let doc = cluster();
        let value = doc
            .require(&["specification", "cloud", "k8s_as_cloud_service"])
            .unwrap();
        assert_eq!(value.as_bool(), Some(true));
    }

    #[test]
    fn test_require_missing_field_is_located() {
        let doc = cluster();
        let err = doc.require(&["specification", "components"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "`specification.components` is missing from `epiphany-cluster` document #3"
        );
    }

    #[test]
    fn test_from_value_rejects_scalars() {
        let err = Document::from_value(1, YamlValue::Number(YamlNumber::Integer(42))).unwrap_err();
        assert!(matches!(err, Error::Type { .. }));
    }

    #[test]
    fn test_label_without_kind() {
        let doc = Document::new(0, IndexMap::new());
        assert_eq!(doc.label(), "document #0");
        assert_eq!(doc.kind(), None);
    }
}
