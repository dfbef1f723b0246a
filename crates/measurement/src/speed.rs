//! Exposure duration and reciprocal rating from one block interval.

use contracts::Exposure;

use crate::IntervalError;

/// Converts a block interval into an [`Exposure`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeedCalculator;

impl SpeedCalculator {
    /// Interval length with modular subtraction, correct across one counter wrap
    #[inline]
    pub fn duration_us(start_us: u32, end_us: u32) -> u32 {
        end_us.wrapping_sub(start_us)
    }

    /// Exposure for `start_us..end_us`
    ///
    /// A zero-length interval has no reciprocal and is rejected.
    pub fn compute(start_us: u32, end_us: u32) -> Result<Exposure, IntervalError> {
        match Self::duration_us(start_us, end_us) {
            0 => Err(IntervalError::Zero),
            duration_us => Ok(Exposure::from_micros(duration_us)),
        }
    }
}
