//! Plausibility bounds applied before any calculator runs.

use contracts::IntervalBounds;

use crate::{IntervalError, SpeedCalculator};

/// Rejects degenerate block intervals
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalGuard {
    bounds: IntervalBounds,
}

impl IntervalGuard {
    pub fn new(bounds: IntervalBounds) -> Self {
        Self { bounds }
    }

    /// Interval length if it lies within the bounds (inclusive)
    pub fn check(&self, start_us: u32, end_us: u32) -> Result<u32, IntervalError> {
        let duration_us = SpeedCalculator::duration_us(start_us, end_us);
        if duration_us == 0 {
            return Err(IntervalError::Zero);
        }
        if duration_us < self.bounds.min_us {
            return Err(IntervalError::BelowMinimum {
                duration_us,
                min_us: self.bounds.min_us,
            });
        }
        if duration_us > self.bounds.max_us {
            return Err(IntervalError::AboveMaximum {
                duration_us,
                max_us: self.bounds.max_us,
            });
        }
        Ok(duration_us)
    }
}
