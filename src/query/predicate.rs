//! Predicates over documents.

use super::ast::{Condition, FieldPath, Op};
use crate::document::Document;

/// A boolean test over a document.
///
/// `describe` is used in error messages, so it should read like the
/// condition it checks (e.g. `kind == "epiphany-cluster"`).
pub trait Predicate {
    fn matches(&self, document: &Document) -> bool;

    fn describe(&self) -> String;
}

impl<P: Predicate + ?Sized> Predicate for &P {
    fn matches(&self, document: &Document) -> bool {
        (**self).matches(document)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl Predicate for Condition {
    fn matches(&self, document: &Document) -> bool {
        let Some(value) = document.lookup(&self.path) else {
            return false;
        };
        match &self.op {
            Op::Exists => true,
            Op::Equals(expected) => value.scalar_text().is_some_and(|text| &text == expected),
            Op::StartsWith(prefix) => value
                .scalar_text()
                .is_some_and(|text| text.starts_with(prefix.as_str())),
        }
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

/// Matches documents whose `kind` equals `tag` exactly.
///
/// Comparison is case-sensitive and does no prefix matching:
/// `configuration/app` does not match `configuration/applications`.
///
/// # Example
///
/// ```
/// use docquery::document::parser::load_documents;
/// use docquery::query::{by_kind, select_many};
///
/// let docs = load_documents("---\nkind: configuration/applications\n---\nkind: configuration/app\n", "example").unwrap();
/// assert_eq!(select_many(&docs, &by_kind("configuration/app")).len(), 1);
/// ```
pub fn by_kind(tag: impl Into<String>) -> Condition {
    Condition::new(FieldPath::from_keys(&["kind"]), Op::Equals(tag.into()))
}

/// Matches documents whose `kind` starts with `prefix`.
pub fn kind_prefix(prefix: impl Into<String>) -> Condition {
    Condition::new(FieldPath::from_keys(&["kind"]), Op::StartsWith(prefix.into()))
}

/// A predicate backed by a closure, with a label for diagnostics.
pub struct FnPredicate<F> {
    label: String,
    test: F,
}

impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&Document) -> bool,
{
    fn matches(&self, document: &Document) -> bool {
        (self.test)(document)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Wraps a closure as a `Predicate`.
pub fn predicate<F>(label: impl Into<String>, test: F) -> FnPredicate<F>
where
    F: Fn(&Document) -> bool,
{
    FnPredicate {
        label: label.into(),
        test,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parser::load_documents;

    fn docs() -> Vec<Document> {
        load_documents(
            "---\nkind: Epiphany-Cluster\n---\nkind: epiphany-cluster\nprovider: any\n---\nname: 3\n",
            "test",
        )
        .unwrap()
    }

    #[test]
    fn test_by_kind_is_case_sensitive() {
        let docs = docs();
        let pred = by_kind("epiphany-cluster");
        assert!(!pred.matches(&docs[0]));
        assert!(pred.matches(&docs[1]));
        assert!(!pred.matches(&docs[2]));
    }

    #[test]
    fn test_kind_prefix() {
        let docs = docs();
        let pred = kind_prefix("epiphany");
        assert!(!pred.matches(&docs[0]));
        assert!(pred.matches(&docs[1]));
    }

    #[test]
    fn test_equals_compares_scalar_text() {
        let docs = docs();
        let pred = Condition::parse("name == 3").unwrap();
        assert!(pred.matches(&docs[2]));
    }

    #[test]
    fn test_exists() {
        let docs = docs();
        let pred = Condition::parse("provider").unwrap();
        assert!(!pred.matches(&docs[0]));
        assert!(pred.matches(&docs[1]));
    }

    #[test]
    fn test_closure_predicate() {
        let docs = docs();
        let pred = predicate("has provider", |doc: &Document| doc.provider().is_some());
        assert_eq!(pred.describe(), "has provider");
        assert!(pred.matches(&docs[1]));
        assert!(!pred.matches(&docs[2]));
    }
}
