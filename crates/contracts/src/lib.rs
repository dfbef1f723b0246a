//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - A free-running `u32` microsecond counter (see [`Clock`]) is the only clock
//! - The counter wraps; every difference is taken with modular subtraction
//! - Millisecond values handed to sinks are `f64`

mod blueprint;
mod channel;
mod clock;
mod cycle_config;
mod error;
mod measurement;
mod sink;
mod source;

pub use blueprint::*;
pub use channel::*;
pub use clock::Clock;
pub use cycle_config::*;
pub use error::*;
pub use measurement::*;
pub use sink::*;
pub use source::IntervalSource;
