//! Abstract syntax tree types for document queries.

use std::fmt;

/// A path of mapping keys from a document's root.
///
/// Renders in dotted notation, falling back to bracket notation for keys
/// that contain dots or brackets (`output['private_ips.value']`). The empty
/// path renders as `$`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Creates a path from already split keys.
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn from_keys(keys: &[&str]) -> Self {
        Self::new(keys.iter().map(|k| k.to_string()).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn push(&mut self, key: String) {
        self.segments.push(key);
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "$");
        }
        for (idx, key) in self.segments.iter().enumerate() {
            let needs_brackets = key.is_empty()
                || key
                    .chars()
                    .any(|c| matches!(c, '.' | '[' | ']' | '\'' | '"') || c.is_whitespace());
            if needs_brackets {
                write!(f, "['{}']", key.replace('\'', "\\'"))?;
            } else if idx == 0 {
                write!(f, "{}", key)?;
            } else {
                write!(f, ".{}", key)?;
            }
        }
        Ok(())
    }
}

/// Comparison applied to the value found at a condition's path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Scalar text equals the operand (`path == value`)
    Equals(String),
    /// Scalar text starts with the operand (`path ^= prefix`)
    StartsWith(String),
    /// The path resolves to any value (`path`)
    Exists,
}

/// A single-field condition over a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub path: FieldPath,
    pub op: Op,
}

impl Condition {
    pub fn new(path: FieldPath, op: Op) -> Self {
        Self { path, op }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            Op::Equals(value) => write!(f, "{} == {:?}", self.path, value),
            Op::StartsWith(prefix) => write!(f, "{} ^= {:?}", self.path, prefix),
            Op::Exists => write!(f, "{} exists", self.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_dotted() {
        let path = FieldPath::from_keys(&["specification", "cloud", "k8s_as_cloud_service"]);
        assert_eq!(path.to_string(), "specification.cloud.k8s_as_cloud_service");
    }

    #[test]
    fn test_display_brackets_for_dotted_keys() {
        let path = FieldPath::from_keys(&["azbi", "output", "private_ips.value"]);
        assert_eq!(path.to_string(), "azbi.output['private_ips.value']");
    }

    #[test]
    fn test_display_empty_path() {
        assert_eq!(FieldPath::default().to_string(), "$");
    }

    #[test]
    fn test_condition_display() {
        let cond = Condition::new(
            FieldPath::from_keys(&["kind"]),
            Op::Equals("epiphany-cluster".to_string()),
        );
        assert_eq!(cond.to_string(), "kind == \"epiphany-cluster\"");
    }
}
