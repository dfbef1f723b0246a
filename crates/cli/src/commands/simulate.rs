//! `simulate` command implementation.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use contracts::{BenchBlueprint, PublishPolicy};
use edge_capture::{ShutterProfile, TravelDirection};

use crate::cli::{Direction, SimulateArgs};
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `simulate` command
pub async fn run_simulate(args: &SimulateArgs) -> Result<()> {
    let mut blueprint = load_blueprint(args.config.as_deref())?;

    // Apply CLI overrides
    if args.immediate {
        info!("Overriding publish policy from CLI");
        blueprint.publish = PublishPolicy::Immediate;
    }

    info!(
        polarity = ?blueprint.channels.polarity,
        policy = ?blueprint.publish,
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    let pipeline_config = PipelineConfig {
        blueprint,
        profile: profile_from_args(args),
        shots: args.shots,
        shot_gap_us: args.shot_gap_us,
        pace: Duration::from_millis(args.pace_ms),
        start_us: args.start_us,
        buffer_size: args.buffer_size,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    info!("Starting simulated bench...");
    let stats = Pipeline::new(pipeline_config)
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    stats.print_summary();

    info!("Shutter Tester finished");
    Ok(())
}

/// Load the bench configuration, or the built-in defaults when no path is given
fn load_blueprint(path: Option<&Path>) -> Result<BenchBlueprint> {
    let Some(path) = path else {
        info!("No configuration file given, using defaults");
        return Ok(BenchBlueprint::default());
    };

    info!(config = %path.display(), "Loading configuration");
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

fn profile_from_args(args: &SimulateArgs) -> ShutterProfile {
    ShutterProfile {
        exposure_us: args.exposure_us,
        leading_travel_us: args.leading_us,
        trailing_travel_us: args.trailing_us,
        direction: match args.direction {
            Direction::Forward => TravelDirection::Forward,
            Direction::Reverse => TravelDirection::Reverse,
        },
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
