//! File I/O for captured generator output.
//!
//! Captured output is read from disk or stdin, with transparent gzip
//! decompression.

pub mod loader;
