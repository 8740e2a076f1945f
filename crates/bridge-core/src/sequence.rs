//! Dropped-sample detection from device sequence numbers
//!
//! The bridge forwards sequence numbers untouched; consumers use this tracker
//! to notice gaps. Hardware counters often wrap (4 bits on the reference
//! device), so an optional modulus is supported.

use serde::{Deserialize, Serialize};

/// A discontinuity between two consecutive observed samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceGap {
    /// Last sequence number before the gap
    pub previous: i64,
    /// First sequence number after the gap
    pub current: i64,
    /// Samples missing in between
    pub missing: u64,
}

/// Tracks consecutive sequence numbers and counts what went missing
#[derive(Debug, Clone, Default)]
pub struct SequenceTracker {
    modulus: Option<i64>,
    last: Option<i64>,
    observed: u64,
    dropped: u64,
}

impl SequenceTracker {
    /// Tracker for a counter that never wraps
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker for a counter that wraps at `modulus`
    pub fn wrapping(modulus: i64) -> Self {
        Self {
            modulus: (modulus > 1).then_some(modulus),
            ..Self::default()
        }
    }

    /// Record a sequence number, returning the gap if one preceded it
    pub fn observe(&mut self, seq: i64) -> Option<SequenceGap> {
        self.observed += 1;
        let previous = self.last.replace(seq)?;

        let step = match self.modulus {
            Some(m) => (seq - previous).rem_euclid(m),
            None => seq - previous,
        };

        // A repeated or backwards number on a non-wrapping counter is a
        // device restart, not a gap.
        if step <= 1 {
            return None;
        }

        let missing = (step - 1) as u64;
        self.dropped += missing;
        Some(SequenceGap {
            previous,
            current: seq,
            missing,
        })
    }

    /// Total samples reported missing so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Total samples observed
    pub fn observed(&self) -> u64 {
        self.observed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_sequence_has_no_gaps() {
        let mut tracker = SequenceTracker::new();
        for seq in 0..50 {
            assert!(tracker.observe(seq).is_none());
        }
        assert_eq!(tracker.dropped(), 0);
        assert_eq!(tracker.observed(), 50);
    }

    #[test]
    fn test_gap_is_reported() {
        let mut tracker = SequenceTracker::new();
        tracker.observe(10);
        let gap = tracker.observe(14).unwrap();

        assert_eq!(gap.previous, 10);
        assert_eq!(gap.current, 14);
        assert_eq!(gap.missing, 3);
        assert_eq!(tracker.dropped(), 3);
    }

    #[test]
    fn test_wrapping_counter() {
        let mut tracker = SequenceTracker::wrapping(16);
        tracker.observe(14);
        assert!(tracker.observe(15).is_none());
        assert!(tracker.observe(0).is_none());

        // 0 -> 3 skips 1 and 2
        let gap = tracker.observe(3).unwrap();
        assert_eq!(gap.missing, 2);

        // 3 -> 1 wraps around, skipping 4..=15 and 0
        let gap = tracker.observe(1).unwrap();
        assert_eq!(gap.missing, 13);
        assert_eq!(tracker.dropped(), 15);
    }

    #[test]
    fn test_restart_is_not_a_gap() {
        let mut tracker = SequenceTracker::new();
        tracker.observe(100);
        assert!(tracker.observe(0).is_none());
        assert_eq!(tracker.dropped(), 0);
    }
}
