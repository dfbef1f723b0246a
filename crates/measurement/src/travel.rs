//! Curtain travel from the two outer channels.

use contracts::CurtainTravel;

/// Correlates the outer pair of channels into leading and trailing travel
#[derive(Debug, Clone, Copy, Default)]
pub struct TravelCorrelator;

impl TravelCorrelator {
    /// Distance between two counter values, independent of their order
    ///
    /// Correct while the true separation is below half the wrap period.
    #[inline]
    pub fn separation_us(a: u32, b: u32) -> u32 {
        b.wrapping_sub(a).min(a.wrapping_sub(b))
    }

    /// Travel times from interval starts (leading curtain) and ends
    /// (trailing curtain) of the two outer channels
    pub fn compute(
        leading_start_a: u32,
        leading_start_b: u32,
        trailing_end_a: u32,
        trailing_end_b: u32,
    ) -> CurtainTravel {
        let leading_us = Self::separation_us(leading_start_a, leading_start_b);
        let trailing_us = Self::separation_us(trailing_end_a, trailing_end_b);
        CurtainTravel {
            leading_ms: leading_us as f64 / 1000.0,
            trailing_ms: trailing_us as f64 / 1000.0,
        }
    }
}
