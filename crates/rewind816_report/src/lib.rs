//! REWIND816 Report Writer
//!
//! Small convenience object for building analysis reports from scripts
//! or from the replay core itself. Accumulates literal text lines at an
//! indentation level and flushes them verbatim to a caller-supplied
//! sink; it never interprets what it prints.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod writer;

pub use writer::{ReportError, ReportWriter};
