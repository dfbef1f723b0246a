//! Pipeline orchestrator - coordinates all components.
//!
//! The simulated shutter fires from its own thread into a shared
//! `ChannelBank`; the measurement loop busy-polls the bank on a blocking
//! thread and hands snapshots to the async dispatcher.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{BenchBlueprint, MeasurementSnapshot};
use dispatcher::{create_dispatcher, snapshot_channel};
use edge_capture::{ChannelBank, ManualClock, ShutterProfile, SimulatedShutter};
use measurement::{CycleError, CycleStats, MeasurementCycle};
use tracing::{info, warn};

use super::RunStats;
use crate::error::CliError;

/// Time allowed for sinks to drain after the measurement loop stops
const DISPATCHER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The bench configuration
    pub blueprint: BenchBlueprint,

    /// Shutter to simulate
    pub profile: ShutterProfile,

    /// Number of firings (0 = until shutdown)
    pub shots: u32,

    /// Virtual time between firings (µs)
    pub shot_gap_us: u32,

    /// Real time between firings
    pub pace: Duration,

    /// Initial counter value
    pub start_us: u32,

    /// Snapshot queue capacity
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until all shots are fired or `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<RunStats> {
        let start_time = Instant::now();
        let config = self.config;
        let blueprint = &config.blueprint;

        // Initialize Metrics (optional)
        if let Some(port) = config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Edge capture
        let clock = Arc::new(ManualClock::new(config.start_us));
        let bank = Arc::new(ChannelBank::with_polarity(
            clock.clone(),
            blueprint.channels.polarity,
        ));
        let shutter = SimulatedShutter::new(config.profile)
            .map_err(|e| CliError::invalid_profile(e.to_string()))?
            .with_shots(config.shots)
            .with_shot_gap_us(config.shot_gap_us);

        info!(
            exposure_us = config.profile.exposure_us,
            leading_us = config.profile.leading_travel_us,
            trailing_us = config.profile.trailing_travel_us,
            direction = ?config.profile.direction,
            start_us = config.start_us,
            "Simulated shutter configured"
        );

        // Setup Dispatcher
        let (sender, snapshot_rx) = snapshot_channel(config.buffer_size);
        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - only the final reading will be shown");
        }
        let dispatcher = create_dispatcher(blueprint.sinks.clone(), snapshot_rx)
            .context("Failed to create dispatcher")?;
        let dispatcher_handle = dispatcher.spawn();
        info!(active_sinks = blueprint.sinks.len(), "Dispatcher started");

        // Measurement loop
        let cycle_config = blueprint.to_cycle_config();
        info!(policy = ?cycle_config.publish, "Starting measurement loop");
        let mut cycle = MeasurementCycle::new(Arc::clone(&bank), sender, cycle_config);
        let stop = Arc::new(AtomicBool::new(false));
        let cycle_stop = Arc::clone(&stop);
        let cycle_task = tokio::task::spawn_blocking(move || {
            let stats = cycle.run(&cycle_stop)?;
            // Dropping the cycle closes the snapshot queue
            Ok::<_, CycleError>((stats, cycle.current_snapshot()))
        });

        // Fire
        let shooter = shutter
            .start(Arc::clone(&bank), Arc::clone(&clock), config.pace)
            .ok_or_else(|| CliError::pipeline_execution("shutter already running"))?;
        let shots_done = tokio::task::spawn_blocking(move || shooter.join());

        tokio::select! {
            result = shots_done => match result {
                Ok(Ok(shots)) => info!(shots, "All shots fired"),
                Ok(Err(_)) => warn!("Shutter thread panicked"),
                Err(e) => warn!(error = %e, "Shutter task failed"),
            },
            _ = shutdown => {
                warn!("Received shutdown signal, stopping shutter...");
                shutter.stop();
            }
        }

        // Shutdown
        info!("Shutting down pipeline...");
        stop.store(true, Ordering::SeqCst);
        let (cycle_stats, last_snapshot): (CycleStats, MeasurementSnapshot) = cycle_task
            .await
            .context("Measurement loop panicked")?
            .context("Measurement loop failed")?;

        let sinks = match tokio::time::timeout(DISPATCHER_DRAIN_TIMEOUT, dispatcher_handle).await {
            Ok(Ok(metrics)) => metrics,
            Ok(Err(e)) => {
                warn!(error = %e, "Dispatcher task failed");
                Vec::new()
            }
            Err(_) => {
                warn!("Dispatcher did not drain in time");
                Vec::new()
            }
        };

        let stats = RunStats {
            shots_fired: shutter.fired(),
            duration: start_time.elapsed(),
            cycle: cycle_stats,
            last_snapshot: (last_snapshot.sequence > 0).then_some(last_snapshot),
            sinks,
        };

        for sink in stats.lagging_sinks() {
            warn!(sink, "Sink did not render the final snapshot");
        }

        info!(
            shots = stats.shots_fired,
            snapshots = stats.cycle.snapshots_published,
            duration_secs = stats.duration.as_secs_f64(),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}
