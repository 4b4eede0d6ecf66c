//! REWIND816 Core Types
//!
//! This crate contains pure types and logic with no I/O.
//! All types are serializable with stable, cross-platform encoding.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod addr;
pub mod error;
pub mod registers;
pub mod step;

// Re-exports
pub use addr::{Addr24, MappedRegion, absolute, direct_page};
pub use error::{CoreError, CoreResult};
pub use registers::{RegField, RegWrite, Registers, StatusFlag};
pub use step::StepIndex;
