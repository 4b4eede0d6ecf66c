//! Core error types for REWIND816.

use std::fmt;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Malformed trace log (bad magic, garbled frame)
    Format {
        /// What the reader found wrong
        reason: String,
    },

    /// Trace log version not supported by this reader
    VersionMismatch {
        /// Version this reader understands
        expected: u32,
        /// Version recorded in the log
        actual: u32,
    },

    /// Trace log ends before the data it promises
    Truncated {
        /// Byte offset where reading stopped short
        offset: u64,
    },

    /// Step index outside the recorded run
    Range {
        /// Requested step
        index: u64,
        /// Total steps in the run
        limit: u64,
    },

    /// Breakpoint range with no addresses in it
    EmptyRange {
        /// Inclusive start
        start: u32,
        /// Exclusive end
        end: u32,
    },

    /// Memory query entirely outside any mapped region
    Address {
        /// The 24-bit address queried
        address: u32,
    },

    /// Underlying I/O failure
    Io {
        /// The underlying error's message
        message: String,
    },

    /// Internal error (for unexpected errors)
    Internal {
        /// Error message
        message: String,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format { reason } => write!(f, "Malformed trace log: {}", reason),
            Self::VersionMismatch { expected, actual } => {
                write!(f, "Version mismatch: expected {}, got {}", expected, actual)
            }
            Self::Truncated { offset } => {
                write!(f, "Trace log truncated at offset {}", offset)
            }
            Self::Range { index, limit } => {
                write!(f, "Step {} outside recorded run of {} steps", index, limit)
            }
            Self::EmptyRange { start, end } => {
                write!(f, "Empty address range: [{:#08x}, {:#08x})", start, end)
            }
            Self::Address { address } => {
                write!(f, "Address {:#08x} outside all mapped regions", address)
            }
            Self::Io { message } => write!(f, "I/O error: {}", message),
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl From<postcard::Error> for CoreError {
    fn from(err: postcard::Error) -> Self {
        Self::Format {
            reason: err.to_string(),
        }
    }
}
