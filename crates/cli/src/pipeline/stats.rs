//! Run statistics and summary.

use std::time::Duration;

use contracts::{ChannelId, MeasurementSnapshot};
use dispatcher::MetricsSnapshot;
use measurement::CycleStats;

/// Statistics from a simulated bench run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Shutter firings completed
    pub shots_fired: u32,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Counters from the measurement loop
    pub cycle: CycleStats,

    /// Bench state when the loop stopped (None if nothing was published)
    pub last_snapshot: Option<MeasurementSnapshot>,

    /// Per-sink render counters
    pub sinks: Vec<(String, MetricsSnapshot)>,
}

impl RunStats {
    /// Share of drained intervals that failed the plausibility check, in percent
    pub fn rejection_rate(&self) -> f64 {
        let total = self.cycle.intervals_accepted + self.cycle.intervals_rejected;
        if total > 0 {
            (self.cycle.intervals_rejected as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Sinks that never rendered the last published snapshot
    pub fn lagging_sinks(&self) -> Vec<&str> {
        let published = self.cycle.snapshots_published;
        self.sinks
            .iter()
            .filter(|(_, metrics)| metrics.last_sequence < published)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Shutter Test Results                      ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Shots fired: {}", self.shots_fired);
        println!("   ├─ Loop iterations: {}", self.cycle.iterations);
        println!(
            "   ├─ Intervals accepted/rejected: {}/{} ({:.2}% rejected)",
            self.cycle.intervals_accepted,
            self.cycle.intervals_rejected,
            self.rejection_rate()
        );
        println!(
            "   ├─ Travel joins computed/discarded: {}/{}",
            self.cycle.travel_computed, self.cycle.joins_discarded
        );
        println!(
            "   └─ Snapshots published: {} ({} retries)",
            self.cycle.snapshots_published, self.cycle.publish_retries
        );

        if let Some(snapshot) = &self.last_snapshot {
            println!("\n⏱  Last reading (#{})", snapshot.sequence);
            for channel in ChannelId::ALL {
                match snapshot.exposure(channel) {
                    Some(exposure) => println!("   ├─ {channel}: {exposure}"),
                    None => println!("   ├─ {channel}: --"),
                }
            }
            match snapshot.travel {
                Some(travel) => println!("   └─ Travel: {travel}"),
                None => println!("   └─ Travel: --"),
            }
        }

        if !self.sinks.is_empty() {
            println!("\n📤 Sinks ({})", self.sinks.len());
            for (i, (name, metrics)) in self.sinks.iter().enumerate() {
                let prefix = if i == self.sinks.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                println!(
                    "   {} {}: rendered={}, failed={}, coalesced={}, last=#{}",
                    prefix,
                    name,
                    metrics.render_count,
                    metrics.failure_count,
                    metrics.coalesced_count,
                    metrics.last_sequence
                );
            }
        }

        println!();
    }
}
