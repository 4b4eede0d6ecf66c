//! Step indices.
//!
//! A trace is a dense, zero-based sequence of executed-instruction steps.

use serde::{Deserialize, Serialize};

/// Index of one executed instruction in a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StepIndex(u64);

impl StepIndex {
    /// First step of every trace
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Create from raw value
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get raw value
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Next step
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Advance in place by n steps, saturating
    pub fn advance(&mut self, n: u64) {
        self.0 = self.0.saturating_add(n);
    }

    /// Retreat in place by n steps, clamping at step zero
    pub fn retreat(&mut self, n: u64) {
        self.0 = self.0.saturating_sub(n);
    }
}

impl Default for StepIndex {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for StepIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for StepIndex {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_index() {
        let s = StepIndex::zero();
        assert_eq!(s.as_u64(), 0);

        let s2 = s.next();
        assert_eq!(s2.as_u64(), 1);
        assert_eq!(s.as_u64(), 0); // Original unchanged
    }

    #[test]
    fn test_step_index_ord() {
        let s1 = StepIndex::from_raw(1);
        let s2 = StepIndex::from_raw(2);
        let s3 = StepIndex::from_raw(2);

        assert!(s1 < s2);
        assert_eq!(s2, s3);
    }

    #[test]
    fn test_retreat_clamps_at_zero() {
        let mut s = StepIndex::from_raw(3);
        s.retreat(10);
        assert_eq!(s, StepIndex::zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(StepIndex::from_raw(42).to_string(), "#42");
    }
}
