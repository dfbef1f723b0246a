//! # Measurement
//!
//! Turns latched block intervals into shutter measurements.
//!
//! Responsibilities:
//! - Exposure duration and reciprocal rating per channel (`SpeedCalculator`)
//! - Curtain travel from the two outer channels (`TravelCorrelator`)
//! - Plausibility bounds for raw intervals (`IntervalGuard`)
//! - Publish throttling (`Throttle`)
//! - The non-blocking poll loop tying them together (`MeasurementCycle`)
//!
//! ## Usage Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use contracts::CycleConfig;
//! use edge_capture::{ChannelBank, ManualClock};
//! use measurement::MeasurementCycle;
//!
//! let clock = Arc::new(ManualClock::new(0));
//! let bank = Arc::new(ChannelBank::new(clock.clone()));
//! let mut cycle = MeasurementCycle::new(bank, Vec::new(), CycleConfig::default());
//!
//! loop {
//!     let report = cycle.poll()?;
//!     if let Some(sequence) = report.published {
//!         // ...
//!     }
//! }
//! ```

mod cycle;
mod error;
mod guard;
mod speed;
mod throttle;
mod travel;

// Re-exports
pub use cycle::{CycleState, CycleStats, MeasurementCycle, PollReport};
pub use error::{CycleError, IntervalError};
pub use guard::IntervalGuard;
pub use speed::SpeedCalculator;
pub use throttle::Throttle;
pub use travel::TravelCorrelator;

// Re-export contracts types
pub use contracts::{
    CurtainTravel, CycleConfig, Exposure, IntervalBounds, JoinConfig, MeasurementSnapshot,
    PublishPolicy,
};
