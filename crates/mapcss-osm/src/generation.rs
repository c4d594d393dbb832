//! Dataset generation counter
//!
//! Every mutation of a dataset bumps the counter. Style caches record the
//! generation they were computed against; a newer generation invalidates
//! them wholesale on the next lookup.

use std::sync::atomic::{AtomicU64, Ordering};

/// Generation counter value, incremented on every dataset mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Generation(u64);

impl Generation {
    /// The generation of a freshly created dataset.
    pub const INITIAL: Self = Generation(0);

    /// Raw counter value.
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The generation after one more mutation.
    #[inline]
    pub const fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

/// Thread-safe generation counter owned by a dataset.
#[derive(Debug, Default)]
pub struct AtomicGeneration(AtomicU64);

impl AtomicGeneration {
    /// Creates a counter at [`Generation::INITIAL`].
    pub const fn new() -> Self {
        AtomicGeneration(AtomicU64::new(0))
    }

    /// Current generation.
    #[inline]
    pub fn get(&self) -> Generation {
        Generation(self.0.load(Ordering::Acquire))
    }

    /// Increments the counter and returns the new generation.
    #[inline]
    pub fn bump(&self) -> Generation {
        Generation(self.0.fetch_add(1, Ordering::Release) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_bump() {
        let counter = AtomicGeneration::new();
        assert_eq!(counter.get(), Generation::INITIAL);
        let g1 = counter.bump();
        assert!(g1 > Generation::INITIAL);
        assert_eq!(counter.get(), g1);
        assert_eq!(g1.next(), counter.bump());
    }
}
