//! Reconstructed memory view.
//!
//! A trace only reveals the bytes the program touched, so the view is a
//! sparse image over the log's mapped regions. A query inside a mapped
//! region that the trace never revealed yields the `Unknown` sentinel;
//! only queries entirely outside every mapped region are errors.

use indexmap::IndexMap;
use rewind816_core::{CoreError, CoreResult, MappedRegion};
use serde::{Deserialize, Serialize};

/// A memory query result: the byte or word may not be in the trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemValue<T> {
    /// The trace revealed this value
    Known(T),
    /// Mapped, but the recorded run never touched it
    Unknown,
}

impl<T> MemValue<T> {
    /// The value, if the trace revealed it
    pub fn known(self) -> Option<T> {
        match self {
            Self::Known(v) => Some(v),
            Self::Unknown => None,
        }
    }

    /// Whether the value is known
    #[must_use]
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

/// Sparse byte image over the trace's mapped regions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryImage {
    regions: Vec<MappedRegion>,
    bytes: IndexMap<u32, u8>,
}

impl MemoryImage {
    /// Empty image over the given regions
    #[must_use]
    pub fn new(regions: Vec<MappedRegion>) -> Self {
        Self {
            regions,
            bytes: IndexMap::new(),
        }
    }

    /// Address ranges the trace covers
    #[must_use]
    pub fn regions(&self) -> &[MappedRegion] {
        &self.regions
    }

    /// Whether any mapped region covers the address
    #[must_use]
    pub fn is_mapped(&self, address: u32) -> bool {
        self.regions.iter().any(|r| r.contains(address))
    }

    /// Number of revealed bytes
    #[must_use]
    pub fn revealed(&self) -> usize {
        self.bytes.len()
    }

    /// Record a byte revealed by the trace
    pub fn reveal(&mut self, address: u32, value: u8) {
        self.bytes.insert(address & 0xFF_FFFF, value);
    }

    /// Seed the image from checkpoint memory
    pub fn reveal_all<I: IntoIterator<Item = (u32, u8)>>(&mut self, entries: I) {
        for (address, value) in entries {
            self.reveal(address, value);
        }
    }

    /// Forget all revealed bytes, keeping the region map
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Read one byte
    ///
    /// # Errors
    ///
    /// Fails with an address error outside every mapped region
    pub fn read_byte(&self, address: u32) -> CoreResult<MemValue<u8>> {
        let address = address & 0xFF_FFFF;
        if !self.is_mapped(address) {
            return Err(CoreError::Address { address });
        }
        Ok(match self.bytes.get(&address) {
            Some(&v) => MemValue::Known(v),
            None => MemValue::Unknown,
        })
    }

    /// Read a little-endian word from `address` and `address + 1`
    ///
    /// A word with one mapped and one unmapped byte degrades to
    /// `Unknown`; the query only fails when both bytes are outside every
    /// mapped region.
    ///
    /// # Errors
    ///
    /// Fails with an address error when the word is entirely unmapped
    pub fn read_word(&self, address: u32) -> CoreResult<MemValue<u16>> {
        let lo = self.read_byte(address);
        let hi = self.read_byte(address.wrapping_add(1) & 0xFF_FFFF);
        match (lo, hi) {
            (Err(_), Err(_)) => Err(CoreError::Address {
                address: address & 0xFF_FFFF,
            }),
            (Ok(MemValue::Known(lo)), Ok(MemValue::Known(hi))) => {
                Ok(MemValue::Known(u16::from(lo) | (u16::from(hi) << 8)))
            }
            _ => Ok(MemValue::Unknown),
        }
    }
}
