//! Ready Latch Module
//!
//! One-shot state flag for the `ready` signal. Rehydration has several
//! completion paths (success, prepare failure, enumeration failure, no
//! durable backend at all) and whichever finishes first must fire `ready`
//! exactly once.

use std::sync::atomic::{AtomicU8, Ordering};

const NOT_READY: u8 = 0;
const READYING: u8 = 1;
const READY: u8 = 2;

// == Ready Latch ==
/// Explicit `NotReady | Readying | Ready` state machine.
#[derive(Debug, Default)]
pub struct ReadyLatch {
    state: AtomicU8,
}

impl ReadyLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks rehydration in flight. No effect once readying or ready.
    pub fn begin(&self) {
        let _ = self.state.compare_exchange(
            NOT_READY,
            READYING,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Transitions to ready. Returns `true` only for the first caller;
    /// racing completion paths lose and must not signal.
    pub fn fire(&self) -> bool {
        self.state.swap(READY, Ordering::SeqCst) != READY
    }

    /// Whether `ready` has fired.
    pub fn is_ready(&self) -> bool {
        self.state.load(Ordering::SeqCst) == READY
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latch_starts_not_ready() {
        let latch = ReadyLatch::new();
        assert!(!latch.is_ready());
    }

    #[test]
    fn test_fire_exactly_once() {
        let latch = ReadyLatch::new();
        latch.begin();
        assert!(latch.fire());
        assert!(latch.is_ready());
        assert!(!latch.fire());
        assert!(!latch.fire());
    }

    #[test]
    fn test_fire_without_begin_still_single_shot() {
        let latch = ReadyLatch::new();
        assert!(latch.fire());
        assert!(!latch.fire());
    }

    #[test]
    fn test_begin_after_fire_does_not_reset() {
        let latch = ReadyLatch::new();
        assert!(latch.fire());
        latch.begin();
        assert!(latch.is_ready());
        assert!(!latch.fire());
    }
}
