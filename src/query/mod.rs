//! Document selection.
//!
//! Selection filters a document collection with a `Predicate`, keeping the
//! original order. Checks are built from three calls:
//!
//! - `select_many` - every match, possibly none
//! - `select_one` - the single match, or an error naming the predicate
//! - `select_exactly` - every match, provided there are exactly `n`
//!
//! Predicates come from `by_kind`, `kind_prefix`, parsed `Condition`s
//! (`kind ^= configuration/`) or closures wrapped with `predicate`.
//!
//! # Examples
//!
//! ```
//! use docquery::document::parser::load_documents;
//! use docquery::query::{by_kind, kind_prefix, select_many, select_one};
//!
//! let docs = load_documents(
//!     "---\nkind: epiphany-cluster\n---\nkind: configuration/postgresql\n---\nkind: configuration/applications\n",
//!     "example",
//! ).unwrap();
//!
//! let cluster = select_one(&docs, &by_kind("epiphany-cluster")).unwrap();
//! assert_eq!(cluster.index(), 0);
//! assert_eq!(select_many(&docs, &kind_prefix("configuration/")).len(), 2);
//! ```

pub mod ast;
pub mod parser;
pub mod predicate;

pub use ast::{Condition, FieldPath, Op};
pub use parser::Parser;
pub use predicate::{by_kind, kind_prefix, predicate, FnPredicate, Predicate};

use crate::document::Document;
use crate::error::{Error, Result};
use tracing::debug;

/// Returns every document matching `pred`, in collection order.
pub fn select_many<'a, P>(documents: &'a [Document], pred: &P) -> Vec<&'a Document>
where
    P: Predicate + ?Sized,
{
    let selected: Vec<&Document> = documents.iter().filter(|doc| pred.matches(doc)).collect();
    debug!(query = %pred.describe(), matched = selected.len(), "selected documents");
    selected
}

/// Returns the only document matching `pred`.
///
/// # Errors
///
/// * `Error::NoMatch` when nothing matches
/// * `Error::Cardinality` when more than one document matches
pub fn select_one<'a, P>(documents: &'a [Document], pred: &P) -> Result<&'a Document>
where
    P: Predicate + ?Sized,
{
    let mut selected = select_exactly(documents, pred, 1)?;
    Ok(selected.remove(0))
}

/// Returns the documents matching `pred`, which must number exactly `n`.
pub fn select_exactly<'a, P>(
    documents: &'a [Document],
    pred: &P,
    n: usize,
) -> Result<Vec<&'a Document>>
where
    P: Predicate + ?Sized,
{
    let selected = select_many(documents, pred);
    match selected.len() {
        actual if actual == n => Ok(selected),
        0 => Err(Error::NoMatch {
            query: pred.describe(),
        }),
        actual => Err(Error::Cardinality {
            query: pred.describe(),
            expected: n,
            actual,
        }),
    }
}
