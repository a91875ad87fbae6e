//! YAML stream decoding.
//!
//! This module turns captured text into `YamlValue`s and `Document`s. It is
//! generic: it knows nothing about where the text came from. The two-stage
//! decoding of generator output (an outer mapping whose string field holds
//! the real document stream) is the explicit `decode_module_output` step.
//!
//! # Example
//!
//! ```
//! use docquery::document::parser::load_documents;
//!
//! let yaml = "---\nkind: infrastructure/machine\nname: azbi-0\n---\nkind: infrastructure/machine\nname: azbi-1\n";
//! let docs = load_documents(yaml, "example").unwrap();
//! assert_eq!(docs.len(), 2);
//! assert_eq!(docs[1].kind(), Some("infrastructure/machine"));
//! ```

use super::node::YamlValue;
use super::Document;
use crate::error::{Error, Result};
use crate::query::FieldPath;
use serde::Deserialize;
use serde_yaml::Value as SerdeValue;
use tracing::debug;

/// Decodes every YAML document in `text`, preserving source order.
///
/// `origin` names the input in error messages (e.g. "captured output").
/// Empty input yields an empty sequence.
///
/// # Errors
///
/// Returns `Error::Parse` when the text is not well-formed YAML.
pub fn load_yaml(text: &str, origin: &str) -> Result<Vec<YamlValue>> {
    let mut values = Vec::new();

    for (idx, deserializer) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let value = SerdeValue::deserialize(deserializer).map_err(|source| Error::Parse {
            origin: origin.to_string(),
            source,
        })?;
        values.push(YamlValue::from_serde(value, &format!("document #{}", idx))?);
    }

    debug!(origin, documents = values.len(), "decoded YAML stream");
    Ok(values)
}

/// Decodes a YAML stream into documents.
///
/// Empty documents (a bare `---` marker) are skipped. Every other top-level
/// value must be a mapping. Document indices count only kept documents.
pub fn load_documents(text: &str, origin: &str) -> Result<Vec<Document>> {
    let mut documents = Vec::new();

    for (position, value) in load_yaml(text, origin)?.into_iter().enumerate() {
        if value == YamlValue::Null {
            debug!(origin, position, "skipping empty document");
            continue;
        }
        if !value.is_mapping() {
            return Err(Error::type_mismatch(
                format!("{} document #{}", origin, position),
                "mapping",
                value.type_name(),
            ));
        }
        documents.push(Document::from_value(documents.len(), value)?);
    }

    Ok(documents)
}

/// Decodes text that must hold exactly one YAML document.
pub fn load_single(text: &str, origin: &str) -> Result<YamlValue> {
    let mut values = load_yaml(text, origin)?;
    if values.len() != 1 {
        return Err(Error::type_mismatch(
            origin,
            "a single YAML document",
            format!("{} documents", values.len()),
        ));
    }
    Ok(values.remove(0))
}

/// Returns the YAML text stored as a string at `path` inside `outer`.
///
/// # Errors
///
/// * `Error::MissingField` when a key along the path is absent
/// * `Error::Type` when an intermediate value is not a mapping or the final
///   value is not a string
pub fn extract_embedded<'a>(outer: &'a YamlValue, path: &FieldPath) -> Result<&'a str> {
    let mut current = outer;
    let mut walked = FieldPath::default();

    for key in path.segments() {
        if !current.is_mapping() {
            return Err(Error::type_mismatch(
                walked.to_string(),
                "mapping",
                current.type_name(),
            ));
        }
        walked.push(key.clone());
        current = current
            .get(key)
            .ok_or_else(|| Error::missing_field("captured output", walked.to_string()))?;
    }

    current
        .as_str()
        .ok_or_else(|| Error::type_mismatch(path.to_string(), "string", current.type_name()))
}

/// Decodes generator output: the outer mapping, then the document stream
/// embedded at `path`.
pub fn decode_module_output(raw: &str, path: &FieldPath) -> Result<Vec<Document>> {
    let outer = load_single(raw, "captured output")?;
    let embedded = extract_embedded(&outer, path)?;
    debug!(path = %path, bytes = embedded.len(), "extracted embedded document stream");
    load_documents(embedded, &format!("embedded `{}`", path))
}

/// Encodes documents as a multi-document YAML stream.
///
/// Each document is introduced by a `---` marker, so the output decodes
/// back into an equal collection with `load_documents`.
pub fn dump_documents<'a, I>(documents: I) -> Result<String>
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut out = String::new();
    for document in documents {
        let encoded = serde_yaml::to_string(&document.to_value().to_serde()).map_err(Error::Encode)?;
        out.push_str("---\n");
        out.push_str(&encoded);
    }
    Ok(out)
}
