//! Manually driven microsecond counter.

use std::sync::atomic::{AtomicU32, Ordering};

use contracts::Clock;

/// Manually driven counter for simulation and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now_us: AtomicU32,
}

impl ManualClock {
    /// Counter starting at `start_us`
    pub fn new(start_us: u32) -> Self {
        Self {
            now_us: AtomicU32::new(start_us),
        }
    }

    /// Jump to an absolute counter value
    #[inline]
    pub fn set(&self, now_us: u32) {
        self.now_us.store(now_us, Ordering::Release);
    }

    /// Move forward, wrapping at `u32::MAX`; returns the new value
    #[inline]
    pub fn advance(&self, delta_us: u32) -> u32 {
        self.now_us
            .fetch_add(delta_us, Ordering::AcqRel)
            .wrapping_add(delta_us)
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now_us(&self) -> u32 {
        self.now_us.load(Ordering::Acquire)
    }
}
