//! # Edge Capture
//!
//! Beam-interrupter edge capture.
//!
//! Responsibilities:
//! - Latch block intervals per channel from asynchronous level changes
//! - Hand complete `(start_us, end_us)` pairs to the poll loop without tearing
//! - Provide a manually driven clock for simulation
//! - Simulate a focal-plane shutter firing across the three channels
//!
//! ## Usage Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use contracts::{ChannelId, Clock, EdgeLevel};
//! use edge_capture::ChannelBank;
//!
//! /// Free-running 32-bit microsecond timer of the board
//! struct BoardTimer;
//!
//! impl Clock for BoardTimer {
//!     fn now_us(&self) -> u32 {
//!         read_timer_register()
//!     }
//! }
//!
//! let bank = ChannelBank::new(Arc::new(BoardTimer));
//!
//! // From the level-change interrupt of sensor 2
//! bank.on_edge(ChannelId::Two, EdgeLevel::Blocked);
//! bank.on_edge(ChannelId::Two, EdgeLevel::Clear);
//!
//! // From the poll loop
//! if let Some((start_us, end_us)) = bank.drain(ChannelId::Two) {
//!     // ...
//! }
//! ```

mod bank;
mod channel;
mod clock;
mod error;
mod simulator;

// Re-exports
pub use bank::ChannelBank;
pub use channel::EdgeChannel;
pub use clock::ManualClock;
pub use contracts::{ChannelId, Clock, EdgeLevel, IntervalSource, LinePolarity};
pub use error::{CaptureError, Result};
pub use simulator::{ShutterProfile, SimulatedEdge, SimulatedShutter, TravelDirection};
