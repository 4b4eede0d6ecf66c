//! Trace events.
//!
//! One event per executed instruction: the program counter it ran at,
//! the register bits it changed, and the memory bytes it touched.

use crate::encoding::CanonicalEncode;
use rewind816_core::{RegWrite, StepIndex};
use serde::{Deserialize, Serialize};

/// Direction of a recorded memory access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessDir {
    /// The instruction read this byte
    Read,
    /// The instruction wrote this byte
    Write,
}

/// One byte touched by an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemAccess {
    /// Full 24-bit address
    pub address: u32,
    /// Byte observed or stored
    pub value: u8,
    /// Read or write
    pub dir: AccessDir,
}

impl MemAccess {
    /// A recorded read
    #[must_use]
    pub const fn read(address: u32, value: u8) -> Self {
        Self {
            address,
            value,
            dir: AccessDir::Read,
        }
    }

    /// A recorded write
    #[must_use]
    pub const fn write(address: u32, value: u8) -> Self {
        Self {
            address,
            value,
            dir: AccessDir::Write,
        }
    }
}

/// An immutable record of one executed instruction step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Dense, zero-based step index
    pub step: StepIndex,
    /// 24-bit program counter the instruction executed at
    pub pc: u32,
    /// Register bits the instruction changed
    pub reg_writes: Vec<RegWrite>,
    /// Memory bytes the instruction touched
    pub mem_accesses: Vec<MemAccess>,
}

impl TraceEvent {
    /// Create an event with no deltas
    #[must_use]
    pub fn new(step: StepIndex, pc: u32) -> Self {
        Self {
            step,
            pc: pc & 0xFF_FFFF,
            reg_writes: Vec::new(),
            mem_accesses: Vec::new(),
        }
    }

    /// Attach a register delta
    #[must_use]
    pub fn with_reg(mut self, write: RegWrite) -> Self {
        self.reg_writes.push(write);
        self
    }

    /// Attach a memory access
    #[must_use]
    pub fn with_mem(mut self, access: MemAccess) -> Self {
        self.mem_accesses.push(access);
        self
    }

    /// Whether the instruction wrote any memory
    #[must_use]
    pub fn has_writes(&self) -> bool {
        self.mem_accesses
            .iter()
            .any(|m| m.dir == AccessDir::Write)
    }
}

impl CanonicalEncode for TraceEvent {}
