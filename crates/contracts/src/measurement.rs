//! MeasurementSnapshot - Measurement cycle output
//!
//! Everything a results sink needs to render one update of the bench.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ChannelId;

/// Exposure measured on a single channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    /// Block interval length (µs), always > 0
    pub duration_us: u32,

    /// Block interval length (ms)
    pub duration_ms: f64,

    /// Denominator of the "1/x s" photographic rating
    pub reciprocal: f64,
}

impl Exposure {
    /// Derive millisecond and reciprocal values from a non-zero interval
    #[inline]
    pub fn from_micros(duration_us: u32) -> Self {
        debug_assert!(duration_us > 0, "zero-length exposure");
        Self {
            duration_us,
            duration_ms: duration_us as f64 / 1000.0,
            reciprocal: 1_000_000.0 / duration_us as f64,
        }
    }
}

impl fmt::Display for Exposure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} ms (1/{:.1})", self.duration_ms, self.reciprocal)
    }
}

/// Curtain travel across the two outer channels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurtainTravel {
    /// Leading (opening) curtain travel time (ms)
    pub leading_ms: f64,

    /// Trailing (closing) curtain travel time (ms)
    pub trailing_ms: f64,
}

impl fmt::Display for CurtainTravel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "leading {:.2} ms, trailing {:.2} ms",
            self.leading_ms, self.trailing_ms
        )
    }
}

/// Which values in a snapshot are new since the previous publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshMask {
    /// Per-channel exposure freshness, indexed by [`ChannelId::index`]
    pub exposures: [bool; 3],

    /// Curtain travel freshness
    pub travel: bool,
}

impl FreshMask {
    /// Mark a channel's exposure as new
    #[inline]
    pub fn mark_exposure(&mut self, channel: ChannelId) {
        self.exposures[channel.index()] = true;
    }

    /// Mark the curtain travel as new
    #[inline]
    pub fn mark_travel(&mut self) {
        self.travel = true;
    }

    /// Whether anything is new
    #[inline]
    pub fn any(&self) -> bool {
        self.travel || self.exposures.iter().any(|fresh| *fresh)
    }

    /// Fold another mask into this one
    #[inline]
    pub fn merge(&mut self, other: FreshMask) {
        for (mine, theirs) in self.exposures.iter_mut().zip(other.exposures) {
            *mine |= theirs;
        }
        self.travel |= other.travel;
    }
}

/// Results snapshot handed to sinks
///
/// Carries the latest accepted value of every channel (not only the fresh
/// ones), so a sink can redraw the full bench state from a single snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSnapshot {
    /// Publish sequence number (monotonically increasing, starts at 1)
    pub sequence: u64,

    /// Latest exposure per channel, indexed by [`ChannelId::index`]
    pub exposures: [Option<Exposure>; 3],

    /// Latest curtain travel
    pub travel: Option<CurtainTravel>,

    /// Values that changed since the previous snapshot
    pub fresh: FreshMask,
}

impl MeasurementSnapshot {
    /// Latest exposure of a channel
    #[inline]
    pub fn exposure(&self, channel: ChannelId) -> Option<&Exposure> {
        self.exposures[channel.index()].as_ref()
    }

    /// Whether a channel's exposure is new in this snapshot
    #[inline]
    pub fn is_fresh(&self, channel: ChannelId) -> bool {
        self.fresh.exposures[channel.index()]
    }

    /// Channels that currently hold an exposure
    pub fn measured_channels(&self) -> impl Iterator<Item = (ChannelId, &Exposure)> {
        ChannelId::ALL
            .into_iter()
            .filter_map(|channel| self.exposure(channel).map(|exposure| (channel, exposure)))
    }
}
