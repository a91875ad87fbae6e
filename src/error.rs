//! Error types for document loading, querying and process capture.

use std::time::Duration;
use thiserror::Error;

/// Main error type for docquery operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed YAML
    #[error("malformed YAML in {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A value has the wrong shape for the requested access
    #[error("expected {expected} at `{path}`, found {found}")]
    Type {
        path: String,
        expected: String,
        found: String,
    },

    /// A document lacks a field a check depends on
    #[error("`{path}` is missing from {document}")]
    MissingField { document: String, path: String },

    /// A selection that requires matches found none
    #[error("no document matches {query}")]
    NoMatch { query: String },

    /// A selection found the wrong number of documents
    #[error("expected exactly {expected} document(s) matching {query}, found {actual}")]
    Cardinality {
        query: String,
        expected: usize,
        actual: usize,
    },

    /// Invalid query expression
    #[error("invalid query at position {position}: {message}")]
    Query { position: usize, message: String },

    /// A captured process did not exit in time
    #[error("`{command}` did not exit within {}s", timeout.as_secs_f64())]
    Timeout { command: String, timeout: Duration },

    /// A process could not be started
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Captured process output is not text
    #[error("{origin} is not valid UTF-8: {source}")]
    Utf8 {
        origin: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// Documents could not be encoded back to YAML
    #[error("failed to encode documents: {0}")]
    Encode(#[source] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a type error for the value found at `path`
    pub fn type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::Type {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a missing field error located in `document`
    pub fn missing_field(document: impl Into<String>, path: impl Into<String>) -> Self {
        Self::MissingField {
            document: document.into(),
            path: path.into(),
        }
    }

    /// Create a query syntax error
    pub fn query(position: usize, message: impl Into<String>) -> Self {
        Self::Query {
            position,
            message: message.into(),
        }
    }
}

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_message_names_query_and_counts() {
        let err = Error::Cardinality {
            query: "kind == \"epiphany-cluster\"".to_string(),
            expected: 1,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "expected exactly 1 document(s) matching kind == \"epiphany-cluster\", found 2"
        );
    }

    #[test]
    fn test_missing_field_is_located() {
        let err = Error::missing_field("`epiphany-cluster` document #0", "specification.cloud");
        assert!(err.to_string().contains("specification.cloud"));
        assert!(err.to_string().contains("#0"));
    }

    #[test]
    fn test_timeout_message() {
        let err = Error::Timeout {
            command: "sleep 5".to_string(),
            timeout: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "`sleep 5` did not exit within 1.5s");
    }

    #[test]
    fn test_utf8_message_names_origin() {
        let source = String::from_utf8(vec![0xff]).unwrap_err();
        let err = Error::Utf8 {
            origin: "stdout of `generator init`".to_string(),
            source,
        };
        assert!(err
            .to_string()
            .starts_with("stdout of `generator init` is not valid UTF-8"));
    }
}
