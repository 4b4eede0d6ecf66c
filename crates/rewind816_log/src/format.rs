//! On-disk trace log layout.
//!
//! A log is a fixed preamble, a stream of framed records, and a trailer:
//!
//! ```text
//! [magic 8][version u32 BE][trailer offset u64 BE]
//! [Record frames: Checkpoint every interval-th step, Step otherwise]
//! [Trailer frame: interval, total steps, regions, checkpoint table]
//! ```
//!
//! The trailer offset is patched in when the producer finishes, so the
//! record stream can be written strictly forward. Readers validate the
//! preamble, jump to the trailer, and then have random access to every
//! checkpoint frame.

use crate::checkpoint::{Checkpoint, CheckpointSlot};
use crate::encoding::CanonicalEncode;
use crate::event::TraceEvent;
use rewind816_core::{CoreError, CoreResult, MappedRegion};
use serde::{Deserialize, Serialize};

/// Log file magic
pub const MAGIC: [u8; 8] = *b"RWND816\0";

/// Current format version; anything else is rejected outright
pub const FORMAT_VERSION: u32 = 1;

/// Byte length of the fixed preamble
pub const PREAMBLE_LEN: u64 = 8 + 4 + 8;

/// One frame in the record stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    /// Full-state snapshot, placed before its step's event
    Checkpoint(Checkpoint),
    /// One executed instruction
    Step(TraceEvent),
}

impl CanonicalEncode for Record {}

/// Trailer written after the record stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trailer {
    /// Steps between checkpoints
    pub checkpoint_interval: u32,
    /// Total steps in the recorded run
    pub total_steps: u64,
    /// Address ranges the trace covers
    pub regions: Vec<MappedRegion>,
    /// Offsets of every checkpoint frame, in step order
    pub checkpoints: Vec<CheckpointSlot>,
}

impl CanonicalEncode for Trailer {}

impl Trailer {
    /// Validate internal consistency after decoding
    ///
    /// # Errors
    ///
    /// Returns a format error if the table cannot describe the run
    pub fn validate(&self) -> CoreResult<()> {
        if self.checkpoint_interval == 0 {
            return Err(CoreError::Format {
                reason: "checkpoint interval of zero".to_string(),
            });
        }
        if self.total_steps > 0 && self.checkpoints.is_empty() {
            return Err(CoreError::Format {
                reason: "non-empty run without a checkpoint table".to_string(),
            });
        }
        for pair in self.checkpoints.windows(2) {
            if pair[1].step <= pair[0].step {
                return Err(CoreError::Format {
                    reason: "checkpoint table out of order".to_string(),
                });
            }
        }
        if let Some(first) = self.checkpoints.first()
            && first.step.as_u64() != 0
        {
            return Err(CoreError::Format {
                reason: "first checkpoint is not step 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Encode the fixed preamble
#[must_use]
pub fn encode_preamble(trailer_offset: u64) -> [u8; PREAMBLE_LEN as usize] {
    let mut out = [0u8; PREAMBLE_LEN as usize];
    out[0..8].copy_from_slice(&MAGIC);
    out[8..12].copy_from_slice(&FORMAT_VERSION.to_be_bytes());
    out[12..20].copy_from_slice(&trailer_offset.to_be_bytes());
    out
}

/// Decode and validate the fixed preamble, returning the trailer offset
///
/// # Errors
///
/// Returns a format error on bad magic or an unsupported version
pub fn decode_preamble(bytes: &[u8; PREAMBLE_LEN as usize]) -> CoreResult<u64> {
    if bytes[0..8] != MAGIC {
        return Err(CoreError::Format {
            reason: "bad magic".to_string(),
        });
    }
    let version = u32::from_be_bytes(bytes[8..12].try_into().expect("slice is 4 bytes"));
    if version != FORMAT_VERSION {
        return Err(CoreError::VersionMismatch {
            expected: FORMAT_VERSION,
            actual: version,
        });
    }
    Ok(u64::from_be_bytes(bytes[12..20].try_into().expect("slice is 8 bytes")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind816_core::StepIndex;

    #[test]
    fn test_preamble_roundtrip() {
        let bytes = encode_preamble(0x1122_3344);
        let offset = decode_preamble(&bytes).unwrap();
        assert_eq!(offset, 0x1122_3344);
    }

    #[test]
    fn test_preamble_rejects_bad_magic() {
        let mut bytes = encode_preamble(0);
        bytes[0] = b'X';
        let result = decode_preamble(&bytes);
        assert!(matches!(result, Err(CoreError::Format { .. })));
    }

    #[test]
    fn test_preamble_rejects_future_version() {
        let mut bytes = encode_preamble(0);
        bytes[8..12].copy_from_slice(&2u32.to_be_bytes());
        let result = decode_preamble(&bytes);
        assert_eq!(
            result,
            Err(CoreError::VersionMismatch {
                expected: 1,
                actual: 2
            })
        );
    }

    fn slot(step: u64, offset: u64) -> CheckpointSlot {
        CheckpointSlot {
            step: StepIndex::from_raw(step),
            offset,
        }
    }

    #[test]
    fn test_trailer_validate() {
        let trailer = Trailer {
            checkpoint_interval: 4,
            total_steps: 10,
            regions: vec![MappedRegion::new(0x8000, 0x10000)],
            checkpoints: vec![slot(0, 20), slot(4, 400), slot(8, 800)],
        };
        assert!(trailer.validate().is_ok());
    }

    #[test]
    fn test_trailer_rejects_zero_interval() {
        let trailer = Trailer {
            checkpoint_interval: 0,
            total_steps: 0,
            regions: Vec::new(),
            checkpoints: Vec::new(),
        };
        assert!(trailer.validate().is_err());
    }

    #[test]
    fn test_trailer_rejects_out_of_order_table() {
        let trailer = Trailer {
            checkpoint_interval: 4,
            total_steps: 10,
            regions: Vec::new(),
            checkpoints: vec![slot(0, 20), slot(8, 800), slot(4, 400)],
        };
        assert!(trailer.validate().is_err());
    }

    #[test]
    fn test_trailer_requires_step_zero_checkpoint() {
        let trailer = Trailer {
            checkpoint_interval: 4,
            total_steps: 10,
            regions: Vec::new(),
            checkpoints: vec![slot(4, 400)],
        };
        assert!(trailer.validate().is_err());
    }
}
