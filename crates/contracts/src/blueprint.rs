//! BenchBlueprint - Config Loader output
//!
//! Describes the complete bench configuration: channel wiring, measurement
//! plausibility bounds, publish policy and output routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{
    CycleConfig, IntervalBounds, JoinConfig, LinePolarity, PublishPolicy,
    DEFAULT_JOIN_STALENESS_US, DEFAULT_MAX_INTERVAL_US,
};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete bench configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Receiver wiring
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Interval plausibility and join settings
    #[serde(default)]
    pub measurement: MeasurementSection,

    /// Publish throttling
    #[serde(default)]
    pub publish: PublishPolicy,

    /// Output routing
    #[serde(default = "default_sinks")]
    pub sinks: Vec<SinkConfig>,
}

impl Default for BenchBlueprint {
    fn default() -> Self {
        Self {
            version: ConfigVersion::default(),
            channels: ChannelsConfig::default(),
            measurement: MeasurementSection::default(),
            publish: PublishPolicy::default(),
            sinks: default_sinks(),
        }
    }
}

/// Receiver wiring shared by all three channels
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Meaning of a high receiver line
    #[serde(default)]
    pub polarity: LinePolarity,
}

/// Measurement settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MeasurementSection {
    /// Shortest accepted block interval (µs)
    #[serde(default = "default_min_interval_us")]
    pub min_interval_us: u32,

    /// Longest accepted block interval (µs)
    #[serde(default = "default_max_interval_us")]
    pub max_interval_us: u32,

    /// Age (µs) after which half of a travel join is discarded, 0 = never
    #[serde(default = "default_join_staleness_us")]
    pub join_staleness_us: u32,
}

impl Default for MeasurementSection {
    fn default() -> Self {
        Self {
            min_interval_us: default_min_interval_us(),
            max_interval_us: default_max_interval_us(),
            join_staleness_us: default_join_staleness_us(),
        }
    }
}

fn default_min_interval_us() -> u32 {
    1
}

fn default_max_interval_us() -> u32 {
    DEFAULT_MAX_INTERVAL_US
}

fn default_join_staleness_us() -> u32 {
    DEFAULT_JOIN_STALENESS_US
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    16
}

fn default_sinks() -> Vec<SinkConfig> {
    vec![SinkConfig {
        name: "console".to_string(),
        sink_type: SinkType::Log,
        queue_capacity: default_queue_capacity(),
        params: HashMap::new(),
    }]
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Structured log output
    Log,
    /// One JSON document per snapshot on stdout/stderr
    JsonLines,
}

impl BenchBlueprint {
    /// Build a CycleConfig from the blueprint
    pub fn to_cycle_config(&self) -> CycleConfig {
        let measurement = &self.measurement;

        let mut interval = IntervalBounds {
            min_us: measurement.min_interval_us.max(1),
            max_us: measurement.max_interval_us,
        };
        if interval.min_us > interval.max_us {
            std::mem::swap(&mut interval.min_us, &mut interval.max_us);
        }

        let join = JoinConfig {
            staleness_us: (measurement.join_staleness_us > 0)
                .then_some(measurement.join_staleness_us),
        };

        CycleConfig {
            interval,
            join,
            publish: self.publish,
        }
    }
}
