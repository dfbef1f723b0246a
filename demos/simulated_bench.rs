//! Simulated Bench Example
//!
//! Fires a sweep of simulated shutter speeds through the complete
//! measurement chain and prints what the sinks received.
//! Runs without bench hardware.
//!
//! Run with: cargo run --bin simulated_bench [bench.toml]

use std::collections::HashMap;
use std::sync::Arc;

use config_loader::ConfigLoader;
use contracts::{
    BenchBlueprint, ChannelId, Clock, MeasurementSnapshot, PublishPolicy, SinkConfig, SinkType,
};
use dispatcher::create_dispatcher;
use edge_capture::{ChannelBank, ManualClock, ShutterProfile, SimulatedShutter, TravelDirection};
use measurement::MeasurementCycle;
use tokio::sync::mpsc;

/// Idle iterations polled after each firing
const SETTLE_ITERATIONS: u32 = 64;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting Simulated Bench Demo");

    // ==== Stage 1: Use default config or load from file ====
    let blueprint = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading bench config");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        create_demo_blueprint()
    };

    // ==== Stage 2: Edge capture against a counter close to wrapping ====
    let clock = Arc::new(ManualClock::new(u32::MAX - 100_000));
    let bank = Arc::new(ChannelBank::with_polarity(
        clock.clone(),
        blueprint.channels.polarity,
    ));

    // ==== Stage 3: Fire a sweep of shutter speeds ====
    // Snapshots are collected in a Vec and handed to the dispatcher afterwards
    let mut cycle = MeasurementCycle::new(
        Arc::clone(&bank),
        Vec::<MeasurementSnapshot>::new(),
        blueprint.to_cycle_config(),
    );

    for (exposure_us, direction) in [
        (1_000, TravelDirection::Forward),
        (2_000, TravelDirection::Forward),
        (4_000, TravelDirection::Reverse),
        (8_000, TravelDirection::Reverse),
    ] {
        let shutter = SimulatedShutter::new(ShutterProfile {
            exposure_us,
            leading_travel_us: 6_000,
            trailing_travel_us: 5_500,
            direction,
        })?;
        shutter.fire_once(&bank, &clock);
        tracing::info!(exposure_us, ?direction, now_us = clock.now_us(), "Shutter fired");

        for _ in 0..SETTLE_ITERATIONS {
            cycle.poll()?;
            clock.advance(1_000);
        }
        if let Some(sequence) = cycle.flush()? {
            tracing::info!(sequence, "Flushed pending values");
        }
        clock.advance(500_000);
    }

    let stats = cycle.stats();
    let final_reading = cycle.current_snapshot();
    let snapshots = cycle.into_publisher();
    tracing::info!(
        iterations = stats.iterations,
        accepted = stats.intervals_accepted,
        rejected = stats.intervals_rejected,
        travel = stats.travel_computed,
        published = stats.snapshots_published,
        "Sweep complete"
    );

    // ==== Stage 4: Setup Dispatcher and replay the snapshots ====
    let (tx, rx) = mpsc::channel::<MeasurementSnapshot>(64);
    let dispatcher_handle = create_dispatcher(blueprint.sinks.clone(), rx)?.spawn();
    tracing::info!(sinks = blueprint.sinks.len(), "Dispatcher started");

    for snapshot in snapshots {
        tx.send(snapshot).await?;
    }
    drop(tx);

    for (sink, metrics) in dispatcher_handle.await? {
        tracing::info!(
            sink = %sink,
            rendered = metrics.render_count,
            coalesced = metrics.coalesced_count,
            last_sequence = metrics.last_sequence,
            "Sink drained"
        );
    }

    // ==== Stage 5: Final reading ====
    println!("Final reading (#{}):", final_reading.sequence);
    for channel in ChannelId::ALL {
        match final_reading.exposure(channel) {
            Some(exposure) => println!("  {channel}: {exposure}"),
            None => println!("  {channel}: --"),
        }
    }
    if let Some(travel) = final_reading.travel {
        println!("  travel: {travel}");
    }

    Ok(())
}

/// Short debounce, log output plus JSON lines on stdout
fn create_demo_blueprint() -> BenchBlueprint {
    let mut blueprint = BenchBlueprint {
        publish: PublishPolicy::Debounced { idle_threshold: 8 },
        ..BenchBlueprint::default()
    };
    blueprint.sinks.push(SinkConfig {
        name: "stdout_json".to_string(),
        sink_type: SinkType::JsonLines,
        queue_capacity: 16,
        params: HashMap::from([("target".to_string(), "stdout".to_string())]),
    });
    blueprint
}
