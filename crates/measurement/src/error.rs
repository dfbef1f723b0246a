//! Measurement error types

use thiserror::Error;

/// Reason a block interval was not turned into a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IntervalError {
    /// Start and end timestamps are equal
    #[error("zero-length interval")]
    Zero,

    /// Shorter than the configured minimum
    #[error("interval of {duration_us} us below minimum of {min_us} us")]
    BelowMinimum { duration_us: u32, min_us: u32 },

    /// Longer than the configured maximum
    #[error("interval of {duration_us} us above maximum of {max_us} us")]
    AboveMaximum { duration_us: u32, max_us: u32 },
}

impl IntervalError {
    /// Short label used as a metric dimension
    pub fn reason(&self) -> &'static str {
        match self {
            IntervalError::Zero => "zero",
            IntervalError::BelowMinimum { .. } => "below_minimum",
            IntervalError::AboveMaximum { .. } => "above_maximum",
        }
    }
}

/// Measurement cycle errors
#[derive(Debug, Error)]
pub enum CycleError {
    /// The snapshot publisher has shut down
    #[error("snapshot publisher closed")]
    PublisherClosed,
}
