//! Breakpoint registry.
//!
//! Breakpoints watch a single program-counter address or a half-open
//! address range. Evaluation is a pure function of the PC and the
//! registry contents; every breakpoint matching a PC is reported, not
//! just the first.

use indexmap::IndexMap;
use rewind816_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Opaque handle to a registered breakpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BreakpointId(u32);

impl BreakpointId {
    /// Raw handle value
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bp{}", self.0)
    }
}

/// A watched address or address range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Breakpoint {
    /// Exact program-counter match
    Exact(u32),
    /// Half-open range `[start, end)`
    Range {
        /// First watched address
        start: u32,
        /// One past the last watched address
        end: u32,
    },
}

impl Breakpoint {
    /// Whether the breakpoint matches a program counter
    #[must_use]
    pub const fn matches(&self, pc: u32) -> bool {
        match *self {
            Self::Exact(addr) => pc == addr,
            Self::Range { start, end } => pc >= start && pc < end,
        }
    }
}

/// Active breakpoints for one replay session
#[derive(Debug, Clone, Default)]
pub struct BreakpointRegistry {
    entries: IndexMap<BreakpointId, Breakpoint>,
    next_id: u32,
}

impl BreakpointRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            next_id: 0,
        }
    }

    fn insert(&mut self, breakpoint: Breakpoint) -> BreakpointId {
        let id = BreakpointId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, breakpoint);
        id
    }

    /// Watch a single address
    pub fn add(&mut self, address: u32) -> BreakpointId {
        self.insert(Breakpoint::Exact(address))
    }

    /// Watch a half-open range `[start, end_exclusive)`
    ///
    /// # Errors
    ///
    /// Fails when the range contains no addresses
    pub fn add_range(&mut self, start: u32, end_exclusive: u32) -> CoreResult<BreakpointId> {
        if end_exclusive <= start {
            return Err(CoreError::EmptyRange {
                start,
                end: end_exclusive,
            });
        }
        Ok(self.insert(Breakpoint::Range {
            start,
            end: end_exclusive,
        }))
    }

    /// Remove a breakpoint, returning whether it existed
    pub fn remove(&mut self, id: BreakpointId) -> bool {
        self.entries.shift_remove(&id).is_some()
    }

    /// Look up a breakpoint by handle
    #[must_use]
    pub fn get(&self, id: BreakpointId) -> Option<&Breakpoint> {
        self.entries.get(&id)
    }

    /// Number of active breakpoints
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every breakpoint matching the program counter
    ///
    /// Pure query: no ordering dependency between entries, overlapping
    /// breakpoints all fire together.
    #[must_use]
    pub fn check(&self, pc: u32) -> Vec<BreakpointId> {
        self.entries
            .iter()
            .filter(|(_, bp)| bp.matches(pc))
            .map(|(&id, _)| id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_exact_match() {
        let mut registry = BreakpointRegistry::new();
        let id = registry.add(0x80_8000);
        assert_eq!(registry.check(0x80_8000), vec![id]);
        assert!(registry.check(0x80_8001).is_empty());
    }

    #[test]
    fn test_range_is_half_open() {
        let mut registry = BreakpointRegistry::new();
        let id = registry.add_range(0x8000, 0x8010).unwrap();
        assert_eq!(registry.check(0x8000), vec![id]);
        assert_eq!(registry.check(0x800F), vec![id]);
        assert!(registry.check(0x8010).is_empty());
        assert!(registry.check(0x7FFF).is_empty());
    }

    #[test]
    fn test_empty_range_rejected() {
        let mut registry = BreakpointRegistry::new();
        assert!(registry.add_range(0x8010, 0x8010).is_err());
        assert!(registry.add_range(0x8010, 0x8000).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_overlapping_breakpoints_all_fire() {
        let mut registry = BreakpointRegistry::new();
        let exact = registry.add(0x8008);
        let range = registry.add_range(0x8000, 0x8010).unwrap();
        let other = registry.add(0x9000);

        let hits = registry.check(0x8008);
        assert_eq!(hits.len(), 2);
        assert!(hits.contains(&exact));
        assert!(hits.contains(&range));
        assert!(!hits.contains(&other));
    }

    #[test]
    fn test_remove() {
        let mut registry = BreakpointRegistry::new();
        let id = registry.add(0x8000);
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.check(0x8000).is_empty());
    }

    #[test]
    fn test_handles_stay_unique_after_removal() {
        let mut registry = BreakpointRegistry::new();
        let first = registry.add(0x8000);
        registry.remove(first);
        let second = registry.add(0x8000);
        assert_ne!(first, second);
    }

    #[test]
    fn test_check_is_pure() {
        let mut registry = BreakpointRegistry::new();
        registry.add(0x8000);
        let before = registry.len();
        let _ = registry.check(0x8000);
        let _ = registry.check(0x8000);
        assert_eq!(registry.len(), before);
        assert_eq!(registry.check(0x8000), registry.check(0x8000));
    }

    proptest! {
        #[test]
        fn prop_range_matches_exactly_its_addresses(
            start in 0u32..0xFF_FFFF,
            len in 1u32..0x100,
            pc in 0u32..0x100_0000,
        ) {
            let end = start.saturating_add(len);
            let bp = Breakpoint::Range { start, end };
            prop_assert_eq!(bp.matches(pc), pc >= start && pc < end);
        }
    }
}
