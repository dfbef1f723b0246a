//! Channel identity and edge levels.
//!
//! The bench has exactly three beam interrupters across the shutter plane.
//! Channels 1 and 3 sit at the two edges of the gate and are used jointly
//! for curtain travel; channel 2 sits in the middle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the three fixed sensor channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelId {
    One,
    Two,
    Three,
}

impl ChannelId {
    /// All channels in index order
    pub const ALL: [ChannelId; 3] = [ChannelId::One, ChannelId::Two, ChannelId::Three];

    /// The outer pair used for travel correlation
    pub const OUTER: (ChannelId, ChannelId) = (ChannelId::One, ChannelId::Three);

    /// Zero-based array index
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            ChannelId::One => 0,
            ChannelId::Two => 1,
            ChannelId::Three => 2,
        }
    }

    /// One-based channel number as printed on the bench
    #[inline]
    pub const fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    /// Look up a channel by its one-based number
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(ChannelId::One),
            2 => Some(ChannelId::Two),
            3 => Some(ChannelId::Three),
            _ => None,
        }
    }

    /// Whether this channel takes part in travel correlation
    #[inline]
    pub fn is_outer(self) -> bool {
        matches!(self, ChannelId::One | ChannelId::Three)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.number())
    }
}

/// Beam state reported by a level-change interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeLevel {
    /// Transition into "beam blocked" (interval start)
    Blocked,
    /// Transition back to "beam clear" (interval end)
    Clear,
}

impl EdgeLevel {
    /// Map a raw receiver line level to a beam state
    #[inline]
    pub fn from_line(high: bool, polarity: LinePolarity) -> Self {
        match (polarity, high) {
            (LinePolarity::ClearHigh, true) | (LinePolarity::BlockedHigh, false) => {
                EdgeLevel::Clear
            }
            (LinePolarity::ClearHigh, false) | (LinePolarity::BlockedHigh, true) => {
                EdgeLevel::Blocked
            }
        }
    }
}

/// Electrical meaning of a high receiver line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinePolarity {
    /// Line reads high while the beam reaches the receiver
    #[default]
    ClearHigh,
    /// Line reads high while the beam is interrupted
    BlockedHigh,
}
