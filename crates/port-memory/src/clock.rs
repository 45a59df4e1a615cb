//! Hand-driven tick clock

use std::sync::atomic::{AtomicU32, Ordering};

use elog_port::Clock;

/// Clock whose tick count only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    ticks: AtomicU32,
}

impl ManualClock {
    /// Start at `ticks`
    #[must_use]
    pub const fn new(ticks: u32) -> Self {
        Self {
            ticks: AtomicU32::new(ticks),
        }
    }

    /// Jump to `ticks`
    pub fn set(&self, ticks: u32) {
        self.ticks.store(ticks, Ordering::SeqCst);
    }

    /// Move forward, wrapping at `u32::MAX` like a scheduler tick counter
    pub fn advance(&self, by: u32) {
        // fetch_add wraps on overflow
        self.ticks.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_wraps() {
        let clock = ManualClock::new(u32::MAX - 1);

        clock.advance(3);
        assert_eq!(clock.ticks(), 1);

        clock.set(500);
        assert_eq!(clock.ticks(), 500);
    }
}
