//! Emission ordering.
//!
//! Inputs reach the coordinator through separate queues, so the order in which
//! it receives them can differ from the order in which they were emitted.
//! Every trigger payload and control change carries a [`Stamp`] taken when it
//! was emitted; the coordinator uses it to apply inputs in emission order.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

static NEXT_STAMP: AtomicU64 = AtomicU64::new(1);

/// A process-wide, strictly increasing emission counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp(u64);

impl Stamp {
    /// Takes the next stamp. Later calls always return greater stamps.
    pub fn next() -> Self {
        Self(NEXT_STAMP.fetch_add(1, Ordering::SeqCst))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// A value together with the moment it was emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamped<T> {
    pub stamp: Stamp,
    pub value: T,
}

impl<T> Stamped<T> {
    /// Stamps `value` now.
    pub fn now(value: T) -> Self {
        Self {
            stamp: Stamp::next(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamps_increase() {
        let first = Stamped::now("a");
        let second = Stamped::now("b");
        assert!(first.stamp < second.stamp);
        assert!(second.stamp.get() > first.stamp.get());
    }
}
