//! Periodic full-state checkpoints.
//!
//! A checkpoint is the complete reconstructed state after executing its
//! step. Checkpoints bound random-access cost: reconstructing any step
//! never scans more than one checkpoint interval of events.

use crate::encoding::CanonicalEncode;
use rewind816_core::{Registers, StepIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Full-state snapshot after executing one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Step this checkpoint captures (state after the step ran)
    pub step: StepIndex,
    /// Full register snapshot
    pub registers: Registers,
    /// Every memory byte the trace has revealed so far
    pub memory: BTreeMap<u32, u8>,
}

impl Checkpoint {
    /// Snapshot the given state
    #[must_use]
    pub fn new(step: StepIndex, registers: Registers, memory: BTreeMap<u32, u8>) -> Self {
        Self {
            step,
            registers,
            memory,
        }
    }

    /// Number of revealed memory bytes
    #[must_use]
    pub fn memory_bytes(&self) -> usize {
        self.memory.len()
    }
}

impl CanonicalEncode for Checkpoint {}

/// Table entry locating a checkpoint frame in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointSlot {
    /// Step the checkpoint captures
    pub step: StepIndex,
    /// Byte offset of its frame in the record stream
    pub offset: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::CanonicalDecode;
    use rewind816_core::{RegField, RegWrite};

    #[test]
    fn test_checkpoint_roundtrip() {
        let mut regs = Registers::new();
        regs.apply(&RegWrite::wide(RegField::A, 0x1234));
        regs.set_pc(0x808000);

        let mut memory = BTreeMap::new();
        memory.insert(0x7E0000, 0xAA);
        memory.insert(0x7E0001, 0xBB);

        let cp = Checkpoint::new(StepIndex::from_raw(4), regs, memory);
        assert_eq!(cp.memory_bytes(), 2);

        let encoded = cp.encode().unwrap();
        let decoded = Checkpoint::decode(&encoded).unwrap();
        assert_eq!(cp, decoded);
    }

    #[test]
    fn test_slot_ordering_by_step() {
        let s1 = CheckpointSlot {
            step: StepIndex::from_raw(0),
            offset: 0,
        };
        let s2 = CheckpointSlot {
            step: StepIndex::from_raw(4),
            offset: 128,
        };
        assert!(s1.step < s2.step);
    }
}
