//! REWIND816 Trace Log
//!
//! Versioned on-disk format for recorded execution traces and the
//! read-only store that navigates them. Events are canonically encoded
//! and read on demand; logs larger than memory stay on disk.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checkpoint;
pub mod encoding;
pub mod event;
pub mod format;
pub mod store;
pub mod writer;

pub use checkpoint::{Checkpoint, CheckpointSlot};
pub use encoding::{CanonicalDecode, CanonicalEncode, FrameReader, FrameWriter, MAX_FRAME_LEN};
pub use event::{AccessDir, MemAccess, TraceEvent};
pub use format::{Record, Trailer, FORMAT_VERSION, MAGIC};
pub use store::{EventWalker, LogStore, StoreError};
pub use writer::LogWriter;
