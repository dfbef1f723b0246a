//! The fixed set of three channels sharing one clock.

use std::sync::Arc;

use contracts::{ChannelId, Clock, EdgeLevel, IntervalSource, LinePolarity};

use crate::EdgeChannel;

/// Three edge channels plus the clock they timestamp with
///
/// Shared between the edge sources (one per channel) and the poll loop,
/// typically behind an `Arc`.
pub struct ChannelBank {
    channels: [EdgeChannel; 3],
    clock: Arc<dyn Clock>,
    polarity: LinePolarity,
}

impl std::fmt::Debug for ChannelBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelBank")
            .field("channels", &self.channels)
            .field("now_us", &self.clock.now_us())
            .field("polarity", &self.polarity)
            .finish()
    }
}

impl ChannelBank {
    /// Create a bank with the default line polarity
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_polarity(clock, LinePolarity::default())
    }

    /// Create a bank with an explicit line polarity
    pub fn with_polarity(clock: Arc<dyn Clock>, polarity: LinePolarity) -> Self {
        let channels = ChannelId::ALL.map(|id| EdgeChannel::new(id, Arc::clone(&clock)));
        Self {
            channels,
            clock,
            polarity,
        }
    }

    /// Access one channel
    #[inline]
    pub fn channel(&self, id: ChannelId) -> &EdgeChannel {
        &self.channels[id.index()]
    }

    /// Shared clock
    #[inline]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Configured line polarity
    #[inline]
    pub fn polarity(&self) -> LinePolarity {
        self.polarity
    }

    /// Level-change handler for a channel
    #[inline]
    pub fn on_edge(&self, id: ChannelId, level: EdgeLevel) {
        self.channel(id).on_edge(level);
    }

    /// Level-change handler with an already sampled timestamp
    #[inline]
    pub fn on_edge_at(&self, id: ChannelId, level: EdgeLevel, now_us: u32) {
        self.channel(id).on_edge_at(level, now_us);
    }

    /// Level-change handler taking the raw receiver line level
    #[inline]
    pub fn on_line_change(&self, id: ChannelId, high: bool) {
        self.on_edge(id, EdgeLevel::from_line(high, self.polarity));
    }

    /// Take a channel's completed interval, if any
    #[inline]
    pub fn drain(&self, id: ChannelId) -> Option<(u32, u32)> {
        self.channel(id).drain()
    }

    /// Level changes seen per channel
    pub fn edge_counts(&self) -> [u64; 3] {
        ChannelId::ALL.map(|id| self.channel(id).edge_count())
    }
}

impl IntervalSource for ChannelBank {
    #[inline]
    fn drain(&self, channel: ChannelId) -> Option<(u32, u32)> {
        self.channel(channel).drain()
    }

    #[inline]
    fn now_us(&self) -> u32 {
        self.clock.now_us()
    }

    fn edge_counts(&self) -> [u64; 3] {
        ChannelBank::edge_counts(self)
    }
}
