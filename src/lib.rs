//! docquery - query and validate multi-document YAML emitted by cluster
//! configuration generators.
//!
//! The pipeline is: capture generator output ([`runner`] or [`file`]),
//! decode it into [`document::Document`]s ([`document::parser`]), select
//! documents by predicate ([`query`]) and run the validation [`checks`].

pub mod checks;
pub mod config;
pub mod document;
pub mod error;
pub mod file;
pub mod query;
pub mod runner;

pub use error::{Error, Result};
