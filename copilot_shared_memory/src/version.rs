//! Even/odd version counter guarding a segment's payload.

use std::sync::atomic::{AtomicU64, Ordering};

/// Odd while the writer is mid-update, even once the payload is consistent.
/// Readers compare samples taken before and after copying the payload.
#[derive(Debug)]
#[repr(transparent)]
pub struct VersionCounter {
    counter: AtomicU64,
}

impl VersionCounter {
    /// Create a counter at version 0 (stable).
    pub const fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Load the current version.
    #[inline]
    pub fn load(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }

    /// Mark the payload as being rewritten. Returns the odd version.
    #[inline]
    pub fn begin_write(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Publish the rewritten payload. Returns the new even version.
    #[inline]
    pub fn end_write(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Whether `version` denotes a consistent (even) payload.
    #[inline]
    pub const fn is_stable(version: u64) -> bool {
        version % 2 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_unstable_between_begin_and_end() {
        let counter = VersionCounter::new();
        assert!(VersionCounter::is_stable(counter.load()));

        assert_eq!(counter.begin_write(), 1);
        assert!(!VersionCounter::is_stable(counter.load()));

        assert_eq!(counter.end_write(), 2);
        assert!(VersionCounter::is_stable(counter.load()));
    }

    #[test]
    fn each_publish_advances_by_two() {
        let counter = VersionCounter::new();
        for round in 1..=3u64 {
            counter.begin_write();
            assert_eq!(counter.end_write(), 2 * round);
        }
    }
}
