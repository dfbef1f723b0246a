//! Measurement cycle configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};

/// Default idle iterations before a debounced publish (half of a 16-bit range)
pub const DEFAULT_IDLE_THRESHOLD: u32 = (u16::MAX / 2) as u32;

/// Default longest accepted block interval: 60 s
pub const DEFAULT_MAX_INTERVAL_US: u32 = 60_000_000;

/// Default age after which a half-completed travel join is discarded: 2 s
pub const DEFAULT_JOIN_STALENESS_US: u32 = 2_000_000;

/// Measurement cycle configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Plausibility bounds for a single block interval
    #[serde(default)]
    pub interval: IntervalBounds,

    /// Travel join configuration
    #[serde(default)]
    pub join: JoinConfig,

    /// Publish throttling policy
    #[serde(default)]
    pub publish: PublishPolicy,
}

/// Accepted block interval range, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalBounds {
    /// Shortest accepted interval (µs), at least 1
    pub min_us: u32,
    /// Longest accepted interval (µs)
    pub max_us: u32,
}

impl Default for IntervalBounds {
    fn default() -> Self {
        Self {
            min_us: 1,
            max_us: DEFAULT_MAX_INTERVAL_US,
        }
    }
}

/// Outer-channel join configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinConfig {
    /// Discard a waiting half of the join after this many µs (None = wait forever)
    pub staleness_us: Option<u32>,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            staleness_us: Some(DEFAULT_JOIN_STALENESS_US),
        }
    }
}

/// When to hand a snapshot to the sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum PublishPolicy {
    /// Publish on every iteration that produced a new calculation
    Immediate,
    /// Publish once after `idle_threshold` iterations without a new calculation
    Debounced {
        #[serde(default = "default_idle_threshold")]
        idle_threshold: u32,
    },
}

impl Default for PublishPolicy {
    fn default() -> Self {
        PublishPolicy::Debounced {
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
        }
    }
}

fn default_idle_threshold() -> u32 {
    DEFAULT_IDLE_THRESHOLD
}
