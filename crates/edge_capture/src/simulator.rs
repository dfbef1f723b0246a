//! Simulated focal-plane shutter.
//!
//! Produces the six level changes one firing causes across the three
//! channels and feeds them into a [`ChannelBank`] on virtual time.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use contracts::{ChannelId, Clock, EdgeLevel};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{CaptureError, ChannelBank, ManualClock, Result};

/// Direction the curtains cross the gate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelDirection {
    /// Curtains reach channel 1 first
    #[default]
    Forward,
    /// Curtains reach channel 3 first
    Reverse,
}

/// Timing of one shutter firing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutterProfile {
    /// Exposure seen at the centre of the gate (µs)
    pub exposure_us: u32,
    /// Time the leading curtain takes to cross from channel 1 to channel 3 (µs)
    pub leading_travel_us: u32,
    /// Time the trailing curtain takes to cross (µs)
    pub trailing_travel_us: u32,
    /// Crossing direction
    #[serde(default)]
    pub direction: TravelDirection,
}

impl Default for ShutterProfile {
    /// 1/125 s with typical 6 ms vertical-travel curtains
    fn default() -> Self {
        Self {
            exposure_us: 8_000,
            leading_travel_us: 6_000,
            trailing_travel_us: 6_000,
            direction: TravelDirection::Forward,
        }
    }
}

impl ShutterProfile {
    /// Check that every channel sees a non-empty interval
    pub fn validate(&self) -> Result<()> {
        if self.exposure_us == 0 {
            return Err(CaptureError::invalid_profile("exposure_us must be > 0"));
        }
        let skew = self.leading_travel_us.abs_diff(self.trailing_travel_us) as u64;
        // Interval at the gate edges is E -/+ (T - L) / 2
        if 2 * self.exposure_us as u64 <= skew {
            return Err(CaptureError::invalid_profile(format!(
                "exposure {} us too short for travel difference {} us",
                self.exposure_us, skew
            )));
        }
        Ok(())
    }

    /// Relative position of a channel along the travel path, 0.0 to 1.0
    fn position(&self, channel: ChannelId) -> f64 {
        let forward = channel.index() as f64 / 2.0;
        match self.direction {
            TravelDirection::Forward => forward,
            TravelDirection::Reverse => 1.0 - forward,
        }
    }

    /// Level changes of one firing, ordered by offset from the firing start
    pub fn edges(&self) -> Vec<SimulatedEdge> {
        let leading = self.leading_travel_us as f64;
        let trailing = self.trailing_travel_us as f64;
        let exposure = self.exposure_us as f64;

        let mut edges: Vec<SimulatedEdge> = ChannelId::ALL
            .into_iter()
            .flat_map(|channel| {
                let p = self.position(channel);
                let start = (p * leading).round() as u32;
                let end = (0.5 * leading + exposure + (p - 0.5) * trailing).round() as u32;
                [
                    SimulatedEdge {
                        offset_us: start,
                        channel,
                        level: EdgeLevel::Blocked,
                    },
                    SimulatedEdge {
                        offset_us: end,
                        channel,
                        level: EdgeLevel::Clear,
                    },
                ]
            })
            .collect();
        edges.sort_by_key(|edge| edge.offset_us);
        edges
    }

    /// Offset of the last level change of a firing
    pub fn duration_us(&self) -> u32 {
        self.edges().last().map_or(0, |edge| edge.offset_us)
    }
}

/// One scheduled level change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedEdge {
    /// Offset from the start of the firing (µs)
    pub offset_us: u32,
    pub channel: ChannelId,
    pub level: EdgeLevel,
}

/// Fires a [`ShutterProfile`] into a bank, either step by step or from a
/// background thread
pub struct SimulatedShutter {
    profile: ShutterProfile,
    edges: Vec<SimulatedEdge>,
    /// Number of firings for `start`, 0 = until stopped
    shots: u32,
    /// Virtual time between the end of one firing and the start of the next (µs)
    shot_gap_us: u32,
    running: Arc<AtomicBool>,
    fired: Arc<AtomicU32>,
}

impl SimulatedShutter {
    /// Create a simulator for a validated profile
    pub fn new(profile: ShutterProfile) -> Result<Self> {
        profile.validate()?;
        Ok(Self {
            profile,
            edges: profile.edges(),
            shots: 1,
            shot_gap_us: 500_000,
            running: Arc::new(AtomicBool::new(false)),
            fired: Arc::new(AtomicU32::new(0)),
        })
    }

    /// Number of firings for `start`, 0 = until stopped
    pub fn with_shots(mut self, shots: u32) -> Self {
        self.shots = shots;
        self
    }

    /// Virtual gap between firings (µs)
    pub fn with_shot_gap_us(mut self, shot_gap_us: u32) -> Self {
        self.shot_gap_us = shot_gap_us;
        self
    }

    pub fn profile(&self) -> &ShutterProfile {
        &self.profile
    }

    /// Scheduled level changes of one firing
    pub fn edges(&self) -> &[SimulatedEdge] {
        &self.edges
    }

    /// Firings completed so far
    pub fn fired(&self) -> u32 {
        self.fired.load(Ordering::Relaxed)
    }

    /// Fire once, starting at the clock's current value
    ///
    /// Leaves the clock at the time of the last level change.
    pub fn fire_once(&self, bank: &ChannelBank, clock: &ManualClock) {
        fire(&self.edges, bank, clock);
        self.fired.fetch_add(1, Ordering::Relaxed);
    }

    /// Fire repeatedly from a background thread
    ///
    /// `pace` is the real time slept after each firing so a concurrent poll
    /// loop can drain the bank. Returns `None` if already running; the
    /// handle yields the number of firings made.
    pub fn start(
        &self,
        bank: Arc<ChannelBank>,
        clock: Arc<ManualClock>,
        pace: Duration,
    ) -> Option<JoinHandle<u32>> {
        if self.running.swap(true, Ordering::SeqCst) {
            return None;
        }

        let edges = self.edges.clone();
        let shots = self.shots;
        let gap = self.shot_gap_us;
        let running = Arc::clone(&self.running);
        let fired = Arc::clone(&self.fired);

        Some(thread::spawn(move || {
            debug!(shots, gap_us = gap, "simulated shutter started");

            let mut count = 0u32;
            while running.load(Ordering::Relaxed) && (shots == 0 || count < shots) {
                fire(&edges, &bank, &clock);
                count += 1;
                fired.fetch_add(1, Ordering::Relaxed);
                trace!(shot = count, now_us = clock.now_us(), "shutter fired");

                thread::sleep(pace);
                clock.advance(gap);
            }

            running.store(false, Ordering::SeqCst);
            debug!(shots = count, "simulated shutter stopped");
            count
        }))
    }

    /// Ask the background thread to stop after the current firing
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for SimulatedShutter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn fire(edges: &[SimulatedEdge], bank: &ChannelBank, clock: &ManualClock) {
    let base = clock.now_us();
    for edge in edges {
        clock.set(base.wrapping_add(edge.offset_us));
        bank.on_edge(edge.channel, edge.level);
    }
}
