//! IntervalSource - poll-side view of the edge channels

use std::sync::Arc;

use crate::ChannelId;

/// Completed block intervals, consumed by the measurement poll loop
///
/// Implementations must never block: `drain` is called once per channel on
/// every poll iteration.
pub trait IntervalSource: Send + Sync {
    /// Take a channel's completed `(start_us, end_us)` pair, at most once
    fn drain(&self, channel: ChannelId) -> Option<(u32, u32)>;

    /// Current value of the shared microsecond counter
    fn now_us(&self) -> u32;

    /// Level changes seen per channel (diagnostics)
    fn edge_counts(&self) -> [u64; 3] {
        [0; 3]
    }
}

impl<S: IntervalSource + ?Sized> IntervalSource for Arc<S> {
    fn drain(&self, channel: ChannelId) -> Option<(u32, u32)> {
        (**self).drain(channel)
    }

    fn now_us(&self) -> u32 {
        (**self).now_us()
    }

    fn edge_counts(&self) -> [u64; 3] {
        (**self).edge_counts()
    }
}
