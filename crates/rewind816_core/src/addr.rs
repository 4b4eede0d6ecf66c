//! 24-bit addressing for the target processor.
//!
//! Addresses are a bank byte plus a 16-bit offset. The data-bank and
//! direct-page registers modulate how bare 8/16-bit operands resolve to
//! full locations; the composition helpers here mirror that behavior.

use serde::{Deserialize, Serialize};

/// A full 24-bit address split into bank and offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Addr24 {
    /// Bank byte (bits 16..24)
    pub bank: u8,
    /// Offset within the bank (bits 0..16)
    pub offset: u16,
}

impl Addr24 {
    /// Create from bank and offset
    #[must_use]
    pub const fn new(bank: u8, offset: u16) -> Self {
        Self { bank, offset }
    }

    /// Split a raw 24-bit value (upper byte ignored)
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self {
            bank: ((value >> 16) & 0xFF) as u8,
            offset: (value & 0xFFFF) as u16,
        }
    }

    /// Compose back into a raw 24-bit value
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        ((self.bank as u32) << 16) | self.offset as u32
    }

    /// Address of the following byte, wrapping within the bank
    ///
    /// 16-bit operand fetches on the target CPU wrap at the bank boundary
    /// rather than carrying into the bank byte.
    #[must_use]
    pub const fn next_in_bank(&self) -> Self {
        Self {
            bank: self.bank,
            offset: self.offset.wrapping_add(1),
        }
    }
}

impl std::fmt::Display for Addr24 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:02x}:{:04x}", self.bank, self.offset)
    }
}

impl From<u32> for Addr24 {
    fn from(value: u32) -> Self {
        Self::from_raw(value)
    }
}

/// Resolve a 16-bit operand against the data-bank register
#[must_use]
pub const fn absolute(db: u8, offset: u16) -> u32 {
    Addr24::new(db, offset).as_u32()
}

/// Resolve an 8-bit operand against the direct-page register
///
/// Direct-page accesses always land in bank 0; the page offset wraps
/// within the 16-bit bank space.
#[must_use]
pub const fn direct_page(dp: u16, operand: u8) -> u32 {
    dp.wrapping_add(operand as u16) as u32
}

/// A half-open address range `[start, end)` covered by a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedRegion {
    /// First address in the region
    pub start: u32,
    /// One past the last address in the region
    pub end: u32,
}

impl MappedRegion {
    /// Create a new region
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Whether an address falls inside the region
    #[must_use]
    pub const fn contains(&self, address: u32) -> bool {
        address >= self.start && address < self.end
    }

    /// Number of addresses in the region
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the region covers no addresses
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}
